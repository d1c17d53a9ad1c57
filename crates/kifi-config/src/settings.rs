use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// Process-level settings for the background page.
///
/// These do not vary per environment and are not user-editable at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    /// Extension version reported in the handshake and search requests.
    pub version: String,
    pub user_agent: String,
    /// Delay before the first telemetry flush.
    pub initial_flush_delay_ms: u64,
    /// How long a deep-link listener waits for its tab to finish navigating.
    pub deep_link_ttl_ms: u64,
    pub login_popup: PopupGeometry,
    pub logout_popup: PopupGeometry,
    /// Substrings of URLs on which the slider never auto-shows.
    pub restricted_hover_patterns: Vec<String>,
    /// Number of recently visited URLs remembered by the page-load flow.
    pub history_size: usize,
    pub scripts: ScriptManifest,
    /// Canned search results returned without a server round trip.
    pub magic_queries: Vec<MagicQuery>,
}

impl BackgroundSettings {
    /// Load from a TOML file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn initial_flush_delay(&self) -> Duration {
        Duration::from_millis(self.initial_flush_delay_ms)
    }

    pub fn deep_link_ttl(&self) -> Duration {
        Duration::from_millis(self.deep_link_ttl_ms)
    }

    /// Whether `url` contains any restricted pattern.
    pub fn is_restricted(&self, url: &str) -> bool {
        self.restricted_hover_patterns
            .iter()
            .any(|p| url.contains(p.as_str()))
    }

    pub fn magic_query(&self, query: &str) -> Option<&MagicQuery> {
        self.magic_queries.iter().find(|m| m.query == query)
    }
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            user_agent: format!("kifi-background/{}", env!("CARGO_PKG_VERSION")),
            initial_flush_delay_ms: 4_000,
            deep_link_ttl_ms: 15_000,
            login_popup: PopupGeometry {
                width: 1020,
                height: 530,
            },
            logout_popup: PopupGeometry {
                width: 200,
                height: 100,
            },
            restricted_hover_patterns: [
                "www.facebook.com",
                "keepitfindit.com",
                "ezkeep.com",
                "localhost:",
                "maps.google.com",
                "google.com*tbm=isch",
                "www.google.com",
                "google.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            history_size: 200,
            scripts: ScriptManifest::default(),
            magic_queries: Vec::new(),
        }
    }
}

/// Size of a popup window opened by the session flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupGeometry {
    pub width: u32,
    pub height: u32,
}

/// Content-script dependency graph used by `require`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptManifest {
    /// Script path to the scripts it needs loaded first.
    pub script_deps: BTreeMap<String, Vec<String>>,
    /// Script path to the stylesheets it needs.
    pub style_deps: BTreeMap<String, Vec<String>>,
}

impl ScriptManifest {
    /// `path` preceded by its transitive dependencies, dependencies first,
    /// without duplicates.
    pub fn closure(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.visit(path, &mut out, &mut visiting);
        out
    }

    fn visit(&self, path: &str, out: &mut Vec<String>, visiting: &mut Vec<String>) {
        if out.iter().any(|p| p == path) || visiting.iter().any(|p| p == path) {
            return;
        }
        visiting.push(path.to_string());
        if let Some(deps) = self.script_deps.get(path) {
            for dep in deps {
                self.visit(dep, out, visiting);
            }
        }
        visiting.pop();
        out.push(path.to_string());
    }

    /// Expand `scripts` to their combined closure (first occurrence wins) and
    /// collect the stylesheets those scripts need.
    pub fn resolve(&self, scripts: &[String]) -> (Vec<String>, Vec<String>) {
        let mut all: Vec<String> = Vec::new();
        for s in scripts {
            for p in self.closure(s) {
                if !all.contains(&p) {
                    all.push(p);
                }
            }
        }
        let styles = all
            .iter()
            .filter_map(|s| self.style_deps.get(s))
            .flatten()
            .cloned()
            .collect();
        (all, styles)
    }
}

/// A query whose results are served from settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagicQuery {
    pub query: String,
    pub results: Value,
}
