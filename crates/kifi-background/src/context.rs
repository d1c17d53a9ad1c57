use std::sync::{Arc, Mutex, RwLock};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use kifi_config::{BackgroundSettings, ConfigStore};
use kifi_platform::PlatformAdapter;
use kifi_remote::{ApiCall, RemoteApi, RemoteResult};
use kifi_telemetry::EventLog;
use kifi_types::Session;

use crate::page::UserHistory;

/// Application context shared by every handler.
///
/// Holds the in-memory session, the event buffer, and the host and server
/// handles. Cheap to share behind an `Arc`; no lock is held across an
/// `.await`.
pub struct Background {
    config: ConfigStore,
    settings: BackgroundSettings,
    session: RwLock<Option<Session>>,
    events: Arc<EventLog>,
    platform: Arc<dyn PlatformAdapter>,
    remote: Arc<dyn RemoteApi>,
    pub(crate) history: Mutex<UserHistory>,
}

impl Background {
    pub fn new(
        config: ConfigStore,
        platform: Arc<dyn PlatformAdapter>,
        remote: Arc<dyn RemoteApi>,
        settings: BackgroundSettings,
    ) -> Self {
        let history = UserHistory::new(settings.history_size);
        Self {
            config,
            settings,
            session: RwLock::new(None),
            events: Arc::new(EventLog::new()),
            platform,
            remote,
            history: Mutex::new(history),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn settings(&self) -> &BackgroundSettings {
        &self.settings
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    pub fn platform(&self) -> &Arc<dyn PlatformAdapter> {
        &self.platform
    }

    pub fn remote(&self) -> &Arc<dyn RemoteApi> {
        &self.remote
    }

    // ---- Session ----

    /// Current session, `None` when logged out.
    pub fn session(&self) -> Option<Session> {
        self.session.read().expect("lock poisoned").clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.read().expect("lock poisoned").is_some()
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        let mut slot = self.session.write().expect("lock poisoned");
        match (&*slot, &session) {
            (_, Some(s)) => info!(user = ?s.user_id, "session set"),
            (Some(_), None) => info!("session cleared"),
            (None, None) => {}
        }
        *slot = session;
    }

    /// Session as sent back to pages: the object or `null`.
    pub fn session_json(&self) -> Value {
        match self.session() {
            Some(s) => serde_json::to_value(s).unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    // ---- Config ----

    /// `{config, session}` as answered to `get_conf`.
    pub fn conf_snapshot(&self) -> Value {
        json!({
            "config": self.config.get(),
            "session": self.session_json(),
        })
    }

    // ---- Telemetry ----

    /// Log an event from the positional `[family, name, metaData?, prevEvents?]`
    /// form pages send. Missing family or name drops the event.
    pub fn log_event_args(&self, args: &[Value]) {
        let family = args.first().and_then(Value::as_str);
        let name = args.get(1).and_then(Value::as_str);
        let (Some(family), Some(name)) = (family, name) else {
            warn!(?args, "log_event without family and name");
            return;
        };
        let meta = args.get(2).filter(|v| !v.is_null()).cloned();
        let prev = args.get(3).and_then(Value::as_array).cloned();
        self.events.log_event(family, name, meta, prev);
    }

    // ---- Remote ----

    /// Issue `call` against the configured server.
    pub(crate) async fn call(&self, call: ApiCall) -> RemoteResult<Value> {
        let server = self.config.get().server;
        debug!(call = call.name(), %server, "calling server");
        self.remote.call(&server, &call).await
    }
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("env", &self.config.env())
            .field("logged_in", &self.is_logged_in())
            .field("events", &self.events.len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn conf_snapshot_without_session() {
        let h = harness();
        let v = h.bg.conf_snapshot();
        assert_eq!(v["session"], Value::Null);
        assert_eq!(v["config"]["server"], "keepitfindit.com");
        assert_eq!(v["config"]["max_res"], 5);
        assert_eq!(h.remote.call_count(), 0);
    }

    #[test]
    fn conf_snapshot_with_session() {
        let h = logged_in();
        let v = h.bg.conf_snapshot();
        assert_eq!(v["session"]["userId"], "u-1");
    }

    #[test]
    fn log_event_args_positional() {
        let h = harness();
        h.bg.log_event_args(&[json!("slider"), json!("opened"), json!({"how": "hover"})]);
        h.bg.log_event_args(&[json!("bogus"), json!("opened")]);
        h.bg.log_event_args(&[json!("slider")]);
        let events = h.bg.events().snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name, "opened");
        assert_eq!(events[0].meta_data, Some(json!({"how": "hover"})));
    }
}
