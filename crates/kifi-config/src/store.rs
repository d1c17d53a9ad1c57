use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use kifi_store::KeyValueStore;
use kifi_types::{Env, User};

use crate::config::{keys, Config, DEFAULT_HOVER_TIMEOUT, DEFAULT_MAX_RES, DEFAULT_SHOW_SCORE};
use crate::error::{ConfigError, ConfigResult};
use crate::parse::{parse_bool_or, parse_json_obj_or, parse_non_neg_int_or};

/// Environment-namespaced view over a [`KeyValueStore`].
///
/// Every key except `env` itself is stored as `{env}_{key}`, so switching the
/// environment switches to an independent set of values.
#[derive(Clone)]
pub struct ConfigStore {
    store: Arc<dyn KeyValueStore>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Active environment. Absent, unreadable, or unknown values read as
    /// production.
    pub fn env(&self) -> Env {
        match self.store.get(keys::ENV) {
            Ok(Some(raw)) => raw.parse::<Env>().unwrap_or_else(|e| {
                warn!(error = %e, "falling back to production environment");
                Env::Production
            }),
            Ok(None) => Env::Production,
            Err(e) => {
                error!(error = %e, "failed to read environment");
                Env::Production
            }
        }
    }

    /// Switch environments. Values stored under the previous environment are
    /// left in place.
    pub fn set_env(&self, env: Env) -> ConfigResult<()> {
        debug!(env = %env, "setting environment");
        self.store.set(keys::ENV, env.as_str())?;
        Ok(())
    }

    fn qualified(&self, key: &str) -> String {
        format!("{}_{}", self.env(), key)
    }

    /// Raw namespaced value.
    pub fn raw(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.store.get(&self.qualified(key))?)
    }

    /// Read the full config. Never fails: store errors are logged and each
    /// field falls back to its own default. Writes `env = "production"` when
    /// no environment has been stored yet.
    pub fn get(&self) -> Config {
        let env = match self.store.get(keys::ENV) {
            Ok(Some(raw)) => raw.parse::<Env>().unwrap_or_default(),
            Ok(None) => {
                if let Err(e) = self.store.set(keys::ENV, Env::Production.as_str()) {
                    error!(error = %e, "failed to persist default environment");
                }
                Env::Production
            }
            Err(e) => {
                error!(error = %e, "failed to read environment");
                Env::Production
            }
        };

        let read = |key: &str| -> Option<String> {
            match self.store.get(&format!("{env}_{key}")) {
                Ok(v) => v,
                Err(e) => {
                    error!(key, error = %e, "failed to read config value");
                    None
                }
            }
        };

        Config {
            env,
            server: env.server().to_string(),
            kifi_installation_id: read(keys::KIFI_INSTALLATION_ID),
            bookmark_id: read(keys::BOOKMARK_ID),
            hover_timeout: parse_non_neg_int_or(
                read(keys::HOVER_TIMEOUT).as_deref(),
                DEFAULT_HOVER_TIMEOUT,
            ),
            show_score: parse_bool_or(read(keys::SHOW_SCORE).as_deref(), DEFAULT_SHOW_SCORE),
            max_res: parse_non_neg_int_or(read(keys::MAX_RES).as_deref(), DEFAULT_MAX_RES),
            user: parse_json_obj_or(read(keys::USER).as_deref(), None),
            version: read(keys::VERSION),
        }
    }

    /// Write `value` under the namespaced `key` unless it already holds that
    /// exact string. Returns whether a write happened.
    pub fn set(&self, key: &str, value: &str) -> ConfigResult<bool> {
        let qualified = self.qualified(key);
        let prev = self.store.get(&qualified)?;
        if prev.as_deref() == Some(value) {
            return Ok(false);
        }
        debug!(key, value, prev = ?prev, "setting config");
        self.store.set(&qualified, value)?;
        Ok(true)
    }

    /// Set from a JSON value as received over the message channel. `null`
    /// is a no-op; strings are stored as-is and other values in their JSON
    /// text form.
    pub fn set_value(&self, key: &str, value: &Value) -> ConfigResult<bool> {
        match value {
            Value::Null => Ok(false),
            Value::String(s) => self.set(key, s),
            other => self.set(key, &other.to_string()),
        }
    }

    /// Delete the namespaced key. Returns whether it existed.
    pub fn remove(&self, key: &str) -> ConfigResult<bool> {
        let removed = self.store.remove(&self.qualified(key))?;
        if removed {
            debug!(key, "removed config");
        }
        Ok(removed)
    }

    /// The stored user, only if every identity field is present.
    pub fn user(&self) -> Option<User> {
        let raw = match self.raw(keys::USER) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "failed to read user");
                return None;
            }
        };
        let obj = parse_json_obj_or(raw.as_deref(), None)?;
        let user: User = serde_json::from_value(Value::Object(obj)).ok()?;
        user.is_complete().then_some(user)
    }

    pub fn set_user(&self, user: &User) -> ConfigResult<bool> {
        let json =
            serde_json::to_string(user).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        self.set(keys::USER, &json)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore").field("env", &self.env()).finish()
    }
}
