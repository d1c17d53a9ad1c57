use std::sync::Mutex;

use async_trait::async_trait;

use crate::batch::EventBatch;
use crate::error::{TelemetryError, TelemetryResult};

/// Destination for flushed batches.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Installation id stamped on the next batch.
    fn install_id(&self) -> Option<String>;

    async fn send(&self, batch: &EventBatch) -> TelemetryResult<()>;
}

/// Sink that keeps every batch in memory, optionally failing each send.
#[derive(Debug, Default)]
pub struct RecordingSink {
    install_id: Option<String>,
    fail: bool,
    batches: Mutex<Vec<EventBatch>>,
}

impl RecordingSink {
    pub fn new(install_id: Option<String>) -> Self {
        Self {
            install_id,
            ..Default::default()
        }
    }

    /// A sink that records each attempt and then reports failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<EventBatch> {
        self.batches.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn install_id(&self) -> Option<String> {
        self.install_id.clone()
    }

    async fn send(&self, batch: &EventBatch) -> TelemetryResult<()> {
        self.batches.lock().expect("lock poisoned").push(batch.clone());
        if self.fail {
            return Err(TelemetryError::Delivery("recording sink set to fail".into()));
        }
        Ok(())
    }
}
