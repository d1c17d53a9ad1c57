use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use kifi_config::ConfigStore;
use kifi_remote::{ApiCall, RemoteApi};
use kifi_telemetry::{EventBatch, EventSink, TelemetryError, TelemetryResult};

/// Delivers event batches to `/users/events` on the configured server.
pub struct RemoteEventSink {
    config: ConfigStore,
    remote: Arc<dyn RemoteApi>,
}

impl RemoteEventSink {
    pub fn new(config: ConfigStore, remote: Arc<dyn RemoteApi>) -> Self {
        Self { config, remote }
    }
}

#[async_trait]
impl EventSink for RemoteEventSink {
    fn install_id(&self) -> Option<String> {
        self.config.get().kifi_installation_id
    }

    async fn send(&self, batch: &EventBatch) -> TelemetryResult<()> {
        let batch =
            serde_json::to_value(batch).map_err(|e| TelemetryError::Delivery(e.to_string()))?;
        let server = self.config.get().server;
        let resp = self
            .remote
            .call(&server, &ApiCall::PostEvents { batch })
            .await
            .map_err(|e| TelemetryError::Delivery(e.to_string()))?;
        debug!(response = %resp, "event batch accepted");
        Ok(())
    }
}
