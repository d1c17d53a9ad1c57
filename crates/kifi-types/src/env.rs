use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Deployment environment the extension talks to.
///
/// Every persisted config key is namespaced by the environment name, so
/// switching environments switches to an independent config set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    Production,
    Development,
}

impl Env {
    pub const PRODUCTION_HOST: &'static str = "keepitfindit.com";
    pub const DEVELOPMENT_HOST: &'static str = "dev.ezkeep.com:9000";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    /// API host (no scheme) for this environment.
    pub fn server(&self) -> &'static str {
        match self {
            Self::Production => Self::PRODUCTION_HOST,
            Self::Development => Self::DEVELOPMENT_HOST,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Env {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            other => Err(TypeError::UnknownEnv(other.to_string())),
        }
    }
}
