use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use kifi_types::Env;

/// Names of the persisted config keys (before environment namespacing).
pub mod keys {
    pub const ENV: &str = "env";
    pub const KIFI_INSTALLATION_ID: &str = "kifi_installation_id";
    pub const BOOKMARK_ID: &str = "bookmark_id";
    pub const HOVER_TIMEOUT: &str = "hover_timeout";
    pub const SHOW_SCORE: &str = "show_score";
    pub const MAX_RES: &str = "max_res";
    pub const USER: &str = "user";
    pub const VERSION: &str = "version";
}

pub const DEFAULT_HOVER_TIMEOUT: u64 = 10;
pub const DEFAULT_SHOW_SCORE: bool = false;
pub const DEFAULT_MAX_RES: u64 = 5;

/// Snapshot of the user-facing configuration, assembled fresh on every read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub env: Env,
    /// API host derived from `env`.
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kifi_installation_id: Option<String>,
    /// Id of the root "KeepIt" bookmark folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_id: Option<String>,
    /// Seconds before the slider auto-shows; `0` disables it.
    pub hover_timeout: u64,
    pub show_score: bool,
    pub max_res: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Config {
    /// The record `get()` produces for an empty store in `env`.
    pub fn defaults(env: Env) -> Self {
        Self {
            env,
            server: env.server().to_string(),
            kifi_installation_id: None,
            bookmark_id: None,
            hover_timeout: DEFAULT_HOVER_TIMEOUT,
            show_score: DEFAULT_SHOW_SCORE,
            max_res: DEFAULT_MAX_RES,
            user: None,
            version: None,
        }
    }

    /// `http://{server}{path}`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.server, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults(Env::default())
    }
}
