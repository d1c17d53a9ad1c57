use serde::{Deserialize, Serialize};

/// A request to open a specific pane in a tab once it finishes navigating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLink {
    /// Opaque pane/view identifier understood by the content script.
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DeepLink {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let d: DeepLink = serde_json::from_str(r#"{"locator":"/messages/abc"}"#).unwrap();
        assert_eq!(d, DeepLink::new("/messages/abc"));
    }
}
