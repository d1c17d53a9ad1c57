use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TelemetryError;

/// Closed set of event categories accepted by the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFamily {
    Slider,
    Search,
    Extension,
    Account,
    Notification,
}

impl EventFamily {
    pub const ALL: [EventFamily; 5] = [
        Self::Slider,
        Self::Search,
        Self::Extension,
        Self::Account,
        Self::Notification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slider => "slider",
            Self::Search => "search",
            Self::Extension => "extension",
            Self::Account => "account",
            Self::Notification => "notification",
        }
    }
}

impl fmt::Display for EventFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventFamily {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| TelemetryError::UnknownFamily(s.to_string()))
    }
}

/// A single analytics event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Epoch milliseconds while buffered; relative to the first event of the
    /// batch once sent.
    pub time: i64,
    pub event_family: EventFamily,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_events: Option<Vec<Value>>,
}

impl Event {
    pub fn new(time: i64, family: EventFamily, name: impl Into<String>) -> Self {
        Self {
            time,
            event_family: family,
            event_name: name.into(),
            meta_data: None,
            prev_events: None,
        }
    }

    /// Attach metadata. `null` is treated as absent.
    pub fn with_meta(mut self, meta: Option<Value>) -> Self {
        self.meta_data = meta.filter(|m| !m.is_null());
        self
    }

    /// Attach previous event ids. An empty list is treated as absent.
    pub fn with_prev(mut self, prev: Option<Vec<Value>>) -> Self {
        self.prev_events = prev.filter(|p| !p.is_empty());
        self
    }
}
