use kifi_store::StoreError;

/// Errors from config and settings operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to read settings file {path}: {source}")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
