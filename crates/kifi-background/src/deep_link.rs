use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use kifi_protocol::{endpoints, tab_kinds};
use kifi_types::{DeepLink, TabId, TabMessage, TabUpdate};

use crate::context::Background;

/// Host name of the development server, with or without a port.
const DEV_HOST_NAME: &str = "dev.ezkeep.com";

/// How a deep-link listener ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeepLinkOutcome {
    Delivered,
    TimedOut,
    /// The host stopped publishing tab updates.
    Closed,
}

/// Whether `url` has left the redirect service and the dev host.
pub fn has_forwarded(url: &str, server: &str) -> bool {
    let redirect = format!("{server}{}", endpoints::REDIRECT);
    !url.contains(&redirect) && !url.contains(DEV_HOST_NAME)
}

impl Background {
    /// Wait for `tab` to finish loading its destination, then send it the
    /// link's locator. The listener removes itself after delivery or once the
    /// deep-link TTL passes.
    pub fn add_deep_link_listener(
        self: &Arc<Self>,
        link: DeepLink,
        tab: TabId,
    ) -> JoinHandle<DeepLinkOutcome> {
        let updates = self.platform().tab_updates();
        let deadline = Instant::now() + self.settings().deep_link_ttl();
        debug!(%tab, locator = %link.locator, "deep link listener added");
        let bg = Arc::clone(self);
        tokio::spawn(async move { bg.await_deep_link(updates, link, tab, deadline).await })
    }

    async fn await_deep_link(
        &self,
        mut updates: broadcast::Receiver<TabUpdate>,
        link: DeepLink,
        tab: TabId,
        deadline: Instant,
    ) -> DeepLinkOutcome {
        loop {
            let update = match timeout_at(deadline, updates.recv()).await {
                Err(_) => {
                    debug!(%tab, "deep link listener timed out");
                    return DeepLinkOutcome::TimedOut;
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    warn!(%tab, skipped, "deep link listener missed tab updates");
                    continue;
                }
                Ok(Err(RecvError::Closed)) => return DeepLinkOutcome::Closed,
                Ok(Ok(update)) => update,
            };
            if update.tab.id != tab || !update.is_complete() {
                continue;
            }
            let server = self.config().get().server;
            if !has_forwarded(&update.tab.url, &server) {
                continue;
            }
            debug!(%tab, locator = %link.locator, "sending deep link");
            let message = TabMessage::new(tab_kinds::DEEP_LINK).with("link", link.locator.clone());
            if let Err(e) = self.platform().send_to_tab(tab, message).await {
                warn!(%tab, error = %e, "could not deliver deep link");
            }
            return DeepLinkOutcome::Delivered;
        }
    }
}
