use std::collections::VecDeque;

use serde_json::Value;
use tracing::{debug, warn};

use kifi_protocol::tab_kinds;
use kifi_remote::ApiCall;
use kifi_telemetry::EventFamily;
use kifi_types::{Tab, TabMessage, TabUpdate, WindowKind};

use crate::context::Background;
use crate::error::BackgroundResult;

pub const KEPT_ICON: &str = "icons/kept.png";
pub const KEEP_ICON: &str = "icons/keep.png";

/// Most recent URLs the slider was considered for, newest first.
#[derive(Clone, Debug)]
pub struct UserHistory {
    urls: VecDeque<String>,
    capacity: usize,
}

impl UserHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            urls: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn exists(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// Remember `url`, forgetting the oldest entry once full.
    pub fn add(&mut self, url: &str) {
        self.urls.push_front(url.to_string());
        self.urls.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// How the page-load flow ended for one tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageLoadOutcome {
    /// Logged out; the flow stops before touching the tab.
    NoSession,
    Restricted,
    RecentlyVisited,
    AlreadyKept,
    /// Not kept, but `hover_timeout` is zero.
    AutoShowDisabled,
    /// The tab was told to show the slider after `ms`.
    AutoShow { ms: u64 },
}

impl Background {
    /// Ask the server whether the user has kept `url`.
    ///
    /// `None` without a session. A failed request counts as not kept.
    pub async fn check_whether_kept(&self, url: &str) -> Option<bool> {
        if !self.is_logged_in() {
            debug!(url, "kept check skipped: no session");
            return None;
        }
        let call = ApiCall::CheckBookmark {
            uri: url.to_string(),
        };
        match self.call(call).await {
            Ok(resp) => Some(
                resp.get("user_has_bookmark")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            ),
            Err(e) => {
                warn!(url, error = %e, "kept check failed");
                Some(false)
            }
        }
    }

    /// Show the kept or keep icon in the tab's page action. Tabs outside
    /// normal windows are left alone.
    pub async fn set_page_icon(&self, tab: &Tab, kept: bool) -> BackgroundResult<()> {
        let kind = self.platform().window_kind(tab.window_id).await?;
        if kind != WindowKind::Normal {
            debug!(tab = %tab.id, ?kind, "no page icon outside normal windows");
            return Ok(());
        }
        let icon = if kept { KEPT_ICON } else { KEEP_ICON };
        self.platform().set_page_icon(tab.id, icon).await?;
        self.platform().show_page_action(tab.id).await?;
        Ok(())
    }

    /// Page-load flow for an http page that finished loading.
    pub async fn on_page_load(&self, tab: &Tab) -> BackgroundResult<PageLoadOutcome> {
        debug!(tab = %tab.id, url = %tab.url, "page loaded");
        self.events().record(EventFamily::Extension, "pageLoad");

        let Some(kept) = self.check_whether_kept(&tab.url).await else {
            return Ok(PageLoadOutcome::NoSession);
        };
        self.set_page_icon(tab, kept).await?;

        if self.settings().is_restricted(&tab.url) {
            debug!(url = %tab.url, "restricted");
            return Ok(PageLoadOutcome::Restricted);
        }
        {
            let mut history = self.history.lock().expect("lock poisoned");
            if history.exists(&tab.url) {
                debug!(url = %tab.url, "recently visited");
                return Ok(PageLoadOutcome::RecentlyVisited);
            }
            history.add(&tab.url);
        }

        if kept {
            debug!(url = %tab.url, "already kept");
            return Ok(PageLoadOutcome::AlreadyKept);
        }
        let secs = self.config().get().hover_timeout;
        if secs == 0 {
            return Ok(PageLoadOutcome::AutoShowDisabled);
        }
        let ms = secs.saturating_mul(1000);
        self.platform()
            .send_to_tab(
                tab.id,
                TabMessage::new(tab_kinds::AUTO_SHOW_AFTER).with("ms", ms),
            )
            .await?;
        Ok(PageLoadOutcome::AutoShow { ms })
    }

    /// React to one host tab update: a URL change resets the icon, and a
    /// completed http page runs the page-load flow.
    pub async fn on_tab_update(&self, update: &TabUpdate) {
        if update.url_changed.is_some() {
            if let Err(e) = self.set_page_icon(&update.tab, false).await {
                debug!(tab = %update.tab.id, error = %e, "could not reset page icon");
            }
        }
        if update.is_complete() && update.tab.is_http() {
            if let Err(e) = self.on_page_load(&update.tab).await {
                warn!(tab = %update.tab.id, error = %e, "page load flow failed");
            }
        }
    }

    /// The page-action icon was clicked.
    pub async fn on_page_action_clicked(&self, tab: &Tab) -> BackgroundResult<()> {
        debug!(tab = %tab.id, "page action clicked");
        self.platform()
            .send_to_tab(tab.id, TabMessage::new(tab_kinds::BUTTON_CLICK))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use kifi_platform::TabAction;
    use serde_json::json;

    #[test]
    fn history_is_bounded_newest_first() {
        let mut h = UserHistory::new(2);
        h.add("a");
        h.add("b");
        h.add("c");
        assert_eq!(h.len(), 2);
        assert!(!h.exists("a"));
        assert!(h.exists("b") && h.exists("c"));
    }

    #[tokio::test]
    async fn not_kept_page_gets_auto_show() {
        let h = logged_in();
        h.remote.respond("/bookmarks/check", json!({"user_has_bookmark": false}));
        let tab = h.platform.open_tab("http://news.site/story", WindowKind::Normal);

        let outcome = h.bg.on_page_load(&tab).await.unwrap();
        assert_eq!(outcome, PageLoadOutcome::AutoShow { ms: 10_000 });
        assert_eq!(
            h.platform.actions(),
            vec![
                (tab.id, TabAction::SetIcon(KEEP_ICON.into())),
                (tab.id, TabAction::ShowPageAction),
                (
                    tab.id,
                    TabAction::Message(TabMessage::new("auto_show_after").with("ms", 10_000u64))
                ),
            ]
        );

        // Second load of the same URL is recently visited.
        let again = h.bg.on_page_load(&tab).await.unwrap();
        assert_eq!(again, PageLoadOutcome::RecentlyVisited);
    }

    #[tokio::test]
    async fn kept_page_shows_kept_icon_only() {
        let h = logged_in();
        h.remote.respond("/bookmarks/check", json!({"user_has_bookmark": true}));
        let tab = h.platform.open_tab("http://news.site/kept", WindowKind::Normal);
        let outcome = h.bg.on_page_load(&tab).await.unwrap();
        assert_eq!(outcome, PageLoadOutcome::AlreadyKept);
        assert!(h.platform.messages_to(tab.id).is_empty());
        assert_eq!(h.platform.actions()[0].1, TabAction::SetIcon(KEPT_ICON.into()));
    }

    #[tokio::test]
    async fn check_error_counts_as_not_kept() {
        let h = logged_in();
        h.remote.fail("/bookmarks/check");
        assert_eq!(h.bg.check_whether_kept("http://x").await, Some(false));
    }

    #[tokio::test]
    async fn no_session_stops_flow() {
        let h = harness();
        let tab = h.platform.open_tab("http://news.site/", WindowKind::Normal);
        assert_eq!(h.bg.on_page_load(&tab).await.unwrap(), PageLoadOutcome::NoSession);
        assert!(h.platform.actions().is_empty());
        assert_eq!(h.remote.call_count(), 0);
        assert_eq!(h.bg.events().len(), 1);
    }

    #[tokio::test]
    async fn restricted_urls_skip_auto_show() {
        let h = logged_in();
        let tab = h.platform.open_tab("https://www.google.com/search?q=x", WindowKind::Normal);
        assert_eq!(h.bg.on_page_load(&tab).await.unwrap(), PageLoadOutcome::Restricted);
        assert!(h.platform.messages_to(tab.id).is_empty());
    }

    #[tokio::test]
    async fn zero_hover_timeout_disables_auto_show() {
        let h = logged_in();
        h.bg.config().set("hover_timeout", "0").unwrap();
        let tab = h.platform.open_tab("http://news.site/", WindowKind::Normal);
        assert_eq!(
            h.bg.on_page_load(&tab).await.unwrap(),
            PageLoadOutcome::AutoShowDisabled
        );
    }

    #[tokio::test]
    async fn huge_hover_timeout_saturates() {
        let h = logged_in();
        h.bg.config()
            .set("hover_timeout", "99999999999999999999")
            .unwrap();
        let tab = h.platform.open_tab("http://news.site/", WindowKind::Normal);
        assert_eq!(
            h.bg.on_page_load(&tab).await.unwrap(),
            PageLoadOutcome::AutoShow { ms: u64::MAX }
        );
    }

    #[tokio::test]
    async fn popup_windows_get_no_icon() {
        let h = harness();
        let tab = h.platform.open_tab("http://a/", WindowKind::Popup);
        h.bg.set_page_icon(&tab, true).await.unwrap();
        assert!(h.platform.actions().is_empty());
    }

    #[tokio::test]
    async fn tab_update_resets_icon_then_loads() {
        let h = logged_in();
        let tab = h.platform.open_tab("about:blank", WindowKind::Normal);
        let tab = h.platform.navigate(tab.id, "http://news.site/").unwrap();
        h.bg.on_tab_update(&TabUpdate {
            tab: tab.clone(),
            status: None,
            url_changed: Some(tab.url.clone()),
        })
        .await;
        assert_eq!(h.remote.call_count(), 0);

        h.bg.on_tab_update(&TabUpdate::status(tab.clone(), kifi_types::TabStatus::Complete))
            .await;
        assert_eq!(h.remote.calls_to("/bookmarks/check").len(), 1);
        assert_eq!(h.platform.messages_to(tab.id).len(), 1);
    }

    #[tokio::test]
    async fn page_action_click_sends_button_click() {
        let h = harness();
        let tab = h.platform.open_tab("http://a/", WindowKind::Normal);
        h.bg.on_page_action_clicked(&tab).await.unwrap();
        assert_eq!(h.platform.messages_to(tab.id), vec![TabMessage::new("button_click")]);
    }
}
