use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authenticated identity returned by the `/kifi/start` handshake.
///
/// Only held in memory. Fields the server sends beyond the known ones are
/// kept in `extra` and passed through to response callbacks untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Parse a handshake response body. Non-object bodies are rejected.
    pub fn from_handshake(body: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(body)
    }

    /// Identity fields in the shape persisted under the `user` config key.
    pub fn user(&self) -> User {
        User {
            facebook_id: self.facebook_id.clone(),
            keepit_external_id: self.user_id.clone(),
            avatar_url: self.avatar_url.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identity persisted into config after a successful handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepit_external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    /// A user is complete only when every identity field is present and non-empty.
    pub fn is_complete(&self) -> bool {
        [
            &self.facebook_id,
            &self.keepit_external_id,
            &self.avatar_url,
            &self.name,
        ]
        .iter()
        .all(|f| f.as_deref().is_some_and(|s| !s.is_empty()))
    }
}
