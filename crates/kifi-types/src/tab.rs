use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Host tab identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

/// Host window identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

/// Kind of browser window a tab lives in. Page-action icons are only
/// shown in normal windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Normal,
    Popup,
    Other,
}

/// Snapshot of a tab at the time a message or update was produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
}

impl Tab {
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            url: url.into(),
        }
    }

    pub fn is_http(&self) -> bool {
        self.url.starts_with("http:") || self.url.starts_with("https:")
    }
}

/// Loading state reported with a tab update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

impl FromStr for TabStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(Self::Loading),
            "complete" => Ok(Self::Complete),
            other => Err(TypeError::UnknownTabStatus(other.to_string())),
        }
    }
}

/// One event on the host's tab-updated stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    pub tab: Tab,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TabStatus>,
    /// Set when the update changed the tab's URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_changed: Option<String>,
}

impl TabUpdate {
    pub fn status(tab: Tab, status: TabStatus) -> Self {
        Self {
            tab,
            status: Some(status),
            url_changed: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Some(TabStatus::Complete)
    }

    pub fn is_loading(&self) -> bool {
        self.status == Some(TabStatus::Loading)
    }
}

/// Message posted from the background page to a tab's content script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

impl TabMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_detection() {
        let t = Tab::new(TabId(1), WindowId(1), "https://a.com/x");
        assert!(t.is_http());
        let t = Tab::new(TabId(1), WindowId(1), "chrome://extensions");
        assert!(!t.is_http());
    }

    #[test]
    fn status_parse() {
        assert_eq!("complete".parse::<TabStatus>().unwrap(), TabStatus::Complete);
        assert!("done".parse::<TabStatus>().is_err());
    }

    #[test]
    fn tab_message_wire_shape() {
        let m = TabMessage::new("auto_show_after").with("ms", 10_000);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v, json!({"type": "auto_show_after", "ms": 10000}));
        assert_eq!(m.get("ms"), Some(&json!(10_000)));
    }

    #[test]
    fn update_predicates() {
        let tab = Tab::new(TabId(3), WindowId(1), "http://a");
        assert!(TabUpdate::status(tab.clone(), TabStatus::Complete).is_complete());
        assert!(TabUpdate::status(tab, TabStatus::Loading).is_loading());
    }

    #[test]
    fn tab_id_display() {
        assert_eq!(TabId(7).to_string(), "tab:7");
    }
}
