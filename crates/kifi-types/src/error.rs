use thiserror::Error;

/// Errors produced by type parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown environment: {0}")]
    UnknownEnv(String),

    #[error("unknown tab status: {0}")]
    UnknownTabStatus(String),
}
