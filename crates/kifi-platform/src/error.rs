use kifi_types::{BookmarkId, TabId};

/// Errors from host platform calls.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("bookmark not found: {0}")]
    BookmarkNotFound(BookmarkId),

    #[error("tab not found: {0}")]
    TabNotFound(TabId),

    /// The host has no equivalent of the requested operation.
    #[error("unsupported on this host: {0}")]
    Unsupported(&'static str),

    #[error("host error: {0}")]
    Host(String),
}

/// Result alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
