use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use kifi_protocol::server_url;

use crate::api::RemoteApi;
use crate::call::{ApiCall, Method};
use crate::error::{RemoteError, RemoteResult};

/// [`RemoteApi`] over plain HTTP with reqwest.
///
/// No client-side timeout is configured; a hung request simply never
/// resolves.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(user_agent: &str) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn call(&self, server: &str, call: &ApiCall) -> RemoteResult<Value> {
        let url = server_url(server, &call.path());
        debug!(call = call.name(), method = %call.method(), %url, "remote call");

        let mut request = match call.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };
        let query = call.query();
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = call.body() {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(call = call.name(), status = status.as_u16(), "remote call failed");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if is_json {
            Ok(response.json().await?)
        } else {
            Ok(Value::String(response.text().await?))
        }
    }
}
