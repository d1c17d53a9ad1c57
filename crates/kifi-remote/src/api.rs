use async_trait::async_trait;
use serde_json::Value;

use crate::call::ApiCall;
use crate::error::RemoteResult;

/// Executes [`ApiCall`]s against a server host.
///
/// `server` is a bare host with optional port, e.g. `keepitfindit.com`.
/// JSON responses are returned parsed; any other body comes back as a JSON
/// string.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn call(&self, server: &str, call: &ApiCall) -> RemoteResult<Value>;
}
