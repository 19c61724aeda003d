/*
 *  activity.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Bounded in-memory activity log served by the API
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

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    System,
    Radar,
    Flight,
    Config,
    Error,
    Info,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::System => "SYSTEM",
            Category::Radar => "RADAR",
            Category::Flight => "FLIGHT",
            Category::Config => "CONFIG",
            Category::Error => "ERROR",
            Category::Info => "INFO",
        };
        f.write_str(s)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SYSTEM" => Ok(Category::System),
            "RADAR" => Ok(Category::Radar),
            "FLIGHT" => Ok(Category::Flight),
            "CONFIG" => Ok(Category::Config),
            "ERROR" => Ok(Category::Error),
            "INFO" => Ok(Category::Info),
            other => Err(format!("unknown activity category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub timestamp: String,
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Oldest entries fall off once `capacity` is reached.
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<Activity>>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn log(&self, category: Category, message: impl Into<String>, details: Option<Value>) -> Activity {
        let activity = Activity {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            category,
            message: message.into(),
            details,
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(activity.clone());
        activity
    }

    /// Newest first. The category filter runs before the limit; a limit of
    /// zero means no limit.
    pub fn get(&self, limit: Option<usize>, category: Option<Category>) -> Vec<Activity> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .rev()
            .filter(|a| category.is_none_or(|c| a.category == c))
            .take(limit.filter(|&n| n > 0).unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.log(Category::System, "Activity logs cleared", None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capacity_drops_oldest() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.log(Category::Info, format!("entry {i}"), None);
        }
        let all = log.get(None, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].message, "entry 4");
        assert_eq!(all[2].message, "entry 2");
    }

    #[test]
    fn test_filter_then_limit() {
        let log = ActivityLog::new(10);
        log.log(Category::Radar, "r1", None);
        log.log(Category::Flight, "f1", Some(json!({"count": 2})));
        log.log(Category::Radar, "r2", None);
        log.log(Category::Flight, "f2", None);

        let radar = log.get(Some(1), Some(Category::Radar));
        assert_eq!(radar.len(), 1);
        assert_eq!(radar[0].message, "r2");

        let flights = log.get(None, Some(Category::Flight));
        assert_eq!(flights.iter().map(|a| a.message.as_str()).collect::<Vec<_>>(), vec!["f2", "f1"]);
    }

    #[test]
    fn test_zero_limit_means_everything() {
        let log = ActivityLog::new(10);
        log.log(Category::Radar, "r1", None);
        log.log(Category::Radar, "r2", None);
        assert_eq!(log.get(Some(0), None).len(), 2);
        assert_eq!(log.get(Some(0), Some(Category::Radar)).len(), 2);
    }

    #[test]
    fn test_clear_leaves_marker() {
        let log = ActivityLog::new(10);
        log.log(Category::Config, "c", None);
        log.clear();
        let all = log.get(None, None);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].category, Category::System);
        assert_eq!(all[0].message, "Activity logs cleared");
    }

    #[test]
    fn test_category_parse_and_json() {
        assert_eq!("radar".parse::<Category>(), Ok(Category::Radar));
        assert!("weather".parse::<Category>().is_err());
        let a = ActivityLog::new(1).log(Category::Error, "boom", None);
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["category"], "ERROR");
        assert!(v.get("details").is_none());
    }
}
