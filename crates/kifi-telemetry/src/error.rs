/// Errors from telemetry operations.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("unknown event family: {0}")]
    UnknownFamily(String),

    /// The sink could not deliver a batch.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
