use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::RemoteApi;
use crate::call::ApiCall;
use crate::error::{RemoteError, RemoteResult};

/// [`RemoteApi`] answering from canned responses keyed by path.
///
/// Intended for tests and offline runs. Every call is recorded. Paths with no
/// canned response answer `{}`; paths marked failing answer HTTP 500, and
/// paths marked stalled never answer.
#[derive(Default)]
pub struct InMemoryRemote {
    responses: Mutex<HashMap<String, Value>>,
    failing: Mutex<Vec<String>>,
    stalled: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, ApiCall)>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `path` with `value`.
    pub fn respond(&self, path: &str, value: Value) -> &Self {
        self.responses
            .lock()
            .expect("lock poisoned")
            .insert(path.to_string(), value);
        self
    }

    /// Make calls to `path` fail with HTTP 500.
    pub fn fail(&self, path: &str) -> &Self {
        self.failing
            .lock()
            .expect("lock poisoned")
            .push(path.to_string());
        self
    }

    /// Stop failing calls to `path`.
    pub fn recover(&self, path: &str) -> &Self {
        self.failing
            .lock()
            .expect("lock poisoned")
            .retain(|p| p != path);
        self
    }

    /// Make calls to `path` hang forever, like a request with no response.
    pub fn stall(&self, path: &str) -> &Self {
        self.stalled
            .lock()
            .expect("lock poisoned")
            .push(path.to_string());
        self
    }

    /// Every call made so far, with the server it targeted.
    pub fn calls(&self) -> Vec<(String, ApiCall)> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Calls made to `path`.
    pub fn calls_to(&self, path: &str) -> Vec<ApiCall> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|(_, c)| c.path() == path)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl RemoteApi for InMemoryRemote {
    async fn call(&self, server: &str, call: &ApiCall) -> RemoteResult<Value> {
        let path = call.path();
        self.calls
            .lock()
            .expect("lock poisoned")
            .push((server.to_string(), call.clone()));
        let stalled = self
            .stalled
            .lock()
            .expect("lock poisoned")
            .iter()
            .any(|p| *p == path);
        if stalled {
            return std::future::pending().await;
        }
        if self
            .failing
            .lock()
            .expect("lock poisoned")
            .iter()
            .any(|p| *p == path)
        {
            return Err(RemoteError::Status {
                status: 500,
                body: "scripted failure".into(),
            });
        }
        Ok(self
            .responses
            .lock()
            .expect("lock poisoned")
            .get(&path)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }
}

impl std::fmt::Debug for InMemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRemote")
            .field("calls", &self.call_count())
            .finish()
    }
}
