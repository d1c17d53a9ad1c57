/// Errors from remote API calls.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
