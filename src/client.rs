/*
 *  client.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Client for a running `overhead serve` instance
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use log::{error, trace};
use reqwest::{Client, Method, header};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::api::{FlightsResponse, Health, MessageResponse, ProcessResponse, SessionStatus};
use crate::flight::FlightRecord;

#[derive(Debug, Error)]
pub enum BackendClientError {
    /// Network failure, timeout or a body that would not decode.
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status.
    #[error("Backend returned {status} for {url}")]
    Status { status: u16, url: String },
}

/// Thin JSON client for the backend API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendClientError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .http1_only()
            .connect_timeout(Duration::from_secs(2))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<B, T>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T, BackendClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        trace!("{} {}", method, url);

        let mut req = self.client.request(method.clone(), &url);
        if let Some(b) = body {
            req = req.json(b);
        }

        let response = req.send().await.inspect_err(|e| {
            error!("API request failed: {} {} - {}", method, url, e);
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("API request failed: {} {} - {}", method, url, status);
            return Err(BackendClientError::Status { status: status.as_u16(), url });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn health(&self) -> Result<Health, BackendClientError> {
        self.request::<(), _>(Method::GET, "/health", None).await
    }

    pub async fn is_available(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn flights(&self) -> Result<FlightsResponse, BackendClientError> {
        self.request::<(), _>(Method::GET, "/flights", None).await
    }

    pub async fn process_flight(&self, flight: &FlightRecord) -> Result<ProcessResponse, BackendClientError> {
        self.request(Method::POST, "/flights/process", Some(flight)).await
    }

    pub async fn start_session(&self) -> Result<MessageResponse, BackendClientError> {
        self.request::<(), _>(Method::POST, "/session/start", None).await
    }

    pub async fn stop_session(&self) -> Result<MessageResponse, BackendClientError> {
        self.request::<(), _>(Method::POST, "/session/stop", None).await
    }

    pub async fn session_status(&self) -> Result<SessionStatus, BackendClientError> {
        self.request::<(), _>(Method::GET, "/session/status", None).await
    }
}
