use thiserror::Error;

/// Errors surfaced by background operations.
///
/// The router never hands these back to the sender. They are logged and the
/// sender simply gets no reply.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("config error: {0}")]
    Config(#[from] kifi_config::ConfigError),

    #[error("remote error: {0}")]
    Remote(#[from] kifi_remote::RemoteError),

    #[error("platform error: {0}")]
    Platform(#[from] kifi_platform::PlatformError),

    #[error("handshake response rejected: {0}")]
    Handshake(String),

    /// The bookmark tree has no top-level folder to hold the keep folders.
    #[error("no top-level bookmark folder")]
    NoBookmarkRoot,

    #[error("tab update stream closed")]
    UpdatesClosed,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BackgroundError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type BackgroundResult<T> = Result<T, BackgroundError>;
