use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use kifi_config::keys;
use kifi_telemetry::{EventFamily, EventFlusher, FlushSchedule};
use kifi_types::Session;

use crate::context::Background;
use crate::keeps::sources;
use crate::sink::RemoteEventSink;

/// Why the background page is starting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartReason {
    Install,
    Update,
    Startup,
}

impl StartReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Startup => "startup",
        }
    }
}

impl fmt::Display for StartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Self::Install),
            "update" => Ok(Self::Update),
            "startup" => Ok(Self::Startup),
            other => Err(format!("unknown start reason: {other}")),
        }
    }
}

/// A running background task that stops when shut down or dropped.
pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TaskHandle {
    /// Signal the task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "background task panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Background {
    /// Start-up sequence.
    ///
    /// Logs the reason, runs the version check, and authenticates with the
    /// popup as fallback. After a fresh install, or in development, every
    /// local bookmark is posted once logged in.
    pub async fn start(&self, reason: StartReason) -> Option<Session> {
        info!(%reason, "background starting");
        if reason != StartReason::Startup {
            self.events().record(EventFamily::Extension, reason.as_str());
        }
        self.check_version().await;

        let session = match self.authenticate().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "not authenticated");
                return None;
            }
        };
        if reason == StartReason::Install || self.config().env().is_development() {
            self.post_all_bookmarks(sources::INIT_LOAD).await;
        }
        Some(session)
    }

    /// Compare the running version with the stored one. On a mismatch the
    /// stored user is dropped, every bookmark is re-uploaded, and the new
    /// version is stored. Returns whether they differed.
    pub async fn check_version(&self) -> bool {
        let running = self.settings().version.clone();
        let stored = self.config().get().version;
        if stored.as_deref() == Some(running.as_str()) {
            return false;
        }
        info!(from = ?stored, to = %running, "extension version changed");
        if let Err(e) = self.config().remove(keys::USER) {
            error!(error = %e, "could not remove stored user");
        }
        self.post_all_bookmarks(sources::INIT_LOAD).await;
        if let Err(e) = self.config().set(keys::VERSION, &running) {
            error!(error = %e, "could not store version");
        }
        true
    }

    /// Start the telemetry flush loop against the configured server.
    pub fn spawn_flusher(&self) -> TaskHandle {
        let sink = Arc::new(RemoteEventSink::new(
            self.config().clone(),
            Arc::clone(self.remote()),
        ));
        let schedule = FlushSchedule::new(self.settings().initial_flush_delay());
        let flusher = EventFlusher::new(Arc::clone(self.events()), sink, schedule);
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(flusher.run(rx));
        TaskHandle { shutdown, task }
    }

    /// Feed host tab updates into [`Background::on_tab_update`] until shut
    /// down.
    pub fn spawn_tab_watcher(self: &Arc<Self>) -> TaskHandle {
        let mut updates = self.platform().tab_updates();
        let (shutdown, mut rx) = watch::channel(false);
        let bg = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Ok(update) => bg.on_tab_update(&update).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "tab watcher missed updates");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("tab watcher stopped");
        });
        TaskHandle { shutdown, task }
    }
}
