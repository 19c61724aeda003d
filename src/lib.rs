/*
 *  lib.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
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

//! Finds the aircraft within a radius of an address, remembers which ones
//! a session has already seen, and serves or displays them.

pub mod activity;
pub mod agent;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod faces;
pub mod flight;
pub mod geo;
pub mod geoloc;
pub mod location;
pub mod provider;
pub mod server;
pub mod session;
pub mod tracker;
pub mod vframebuf;
pub mod view;

pub use error::TrackerError;
