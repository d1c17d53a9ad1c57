use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use kifi_types::{
    BookmarkId, BookmarkNode, NewBookmark, Tab, TabId, TabMessage, TabStatus, TabUpdate, WindowId,
    WindowKind,
};

use crate::error::{PlatformError, PlatformResult};
use crate::safari::host::SafariHost;
use crate::safari::pages::{is_http, EmitOutcome, Page, PageRegistry, QueueMode};
use crate::traits::{PlatformAdapter, PopupWindow};

/// Safari exposes no window ids to extensions; every page reports this one.
pub const SAFARI_WINDOW: WindowId = WindowId(0);

const UPDATE_CAPACITY: usize = 256;

/// [`PlatformAdapter`] over Safari's application events.
///
/// The embedder forwards Safari's tab events to the `on_*` methods. Bookmark
/// reads return nothing since Safari offers no bookmark API to extensions,
/// and bookmark writes fail as unsupported.
pub struct SafariPlatform {
    host: Arc<dyn SafariHost>,
    pages: Mutex<PageRegistry>,
    updates: broadcast::Sender<TabUpdate>,
}

impl SafariPlatform {
    pub fn new(host: Arc<dyn SafariHost>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            host,
            pages: Mutex::new(PageRegistry::new()),
            updates,
        }
    }

    pub fn page(&self, id: TabId) -> Option<Page> {
        self.pages.lock().expect("lock poisoned").get(id).cloned()
    }

    /// A tab was opened by the user.
    pub fn on_open(&self, url: &str) -> TabId {
        self.pages.lock().expect("lock poisoned").open(url)
    }

    /// A tab is about to navigate. Its page is replaced and a `loading`
    /// update is published.
    pub fn on_before_navigate(&self, id: TabId, url: &str) {
        let unloaded = self
            .pages
            .lock()
            .expect("lock poisoned")
            .before_navigate(id, url);
        if let Some(old) = unloaded {
            debug!(%id, url = %old.url, "page unloaded");
        }
        let _ = self.updates.send(TabUpdate {
            tab: Tab::new(id, SAFARI_WINDOW, url),
            status: Some(TabStatus::Loading),
            url_changed: Some(url.to_string()),
        });
    }

    pub fn on_close(&self, id: TabId) {
        let page = self.page(id);
        if let Some(page) = page {
            if page.is_http() {
                if let Err(e) = self.host.dispatch_message(id, "api:disconnect", &Value::Null) {
                    warn!(%id, error = %e, "disconnect failed");
                }
            }
        }
        self.pages.lock().expect("lock poisoned").remove(id);
    }

    /// A message arrived from a tab's content page.
    ///
    /// `api:*` kinds are handled here. Any other kind is returned for the
    /// caller to route.
    pub fn on_message(&self, id: TabId, kind: &str, data: Value) -> Option<(String, Value)> {
        match kind {
            "api:handling" => {
                let kinds: Vec<String> = serde_json::from_value(data).unwrap_or_default();
                let ready = self
                    .pages
                    .lock()
                    .expect("lock poisoned")
                    .handling(id, &kinds);
                for (k, d) in ready {
                    self.post(id, &k, &d);
                }
                None
            }
            "api:DOMContentLoaded" => {
                if let Some(page) = self.page(id) {
                    let _ = self.updates.send(TabUpdate::status(
                        Tab::new(id, SAFARI_WINDOW, page.url),
                        TabStatus::Complete,
                    ));
                } else {
                    warn!(%id, "DOMContentLoaded for unknown page");
                }
                None
            }
            "api:pageshow" => {
                if let Some(page) = self.page(id) {
                    let _ = self.updates.send(TabUpdate::status(
                        Tab::new(id, SAFARI_WINDOW, page.url),
                        TabStatus::Loading,
                    ));
                }
                None
            }
            k if k.starts_with("api:") => {
                debug!(%id, kind = k, "page lifecycle message");
                None
            }
            _ => Some((kind.to_string(), data)),
        }
    }

    /// Route a message through the page registry, delivering it if the page
    /// already handles its kind.
    pub fn emit(
        &self,
        id: TabId,
        expected_url: Option<&str>,
        kind: &str,
        data: Value,
        queue: QueueMode,
    ) -> EmitOutcome {
        let outcome = self
            .pages
            .lock()
            .expect("lock poisoned")
            .emit(id, expected_url, kind, data, queue);
        if let EmitOutcome::Deliver { kind, data } = &outcome {
            self.post(id, kind, data);
        }
        outcome
    }

    fn post(&self, id: TabId, kind: &str, data: &Value) {
        let url = self.page(id).map(|p| p.url).unwrap_or_default();
        if !is_http(&url) {
            warn!(%id, kind, %url, "cannot message non-http page");
            return;
        }
        if let Err(e) = self.host.dispatch_message(id, kind, data) {
            warn!(%id, kind, error = %e, "dispatch failed");
        }
    }

    fn require_page(&self, id: TabId) -> PlatformResult<Page> {
        self.page(id).ok_or(PlatformError::TabNotFound(id))
    }
}

#[async_trait]
impl PlatformAdapter for SafariPlatform {
    async fn bookmark_get(&self, _id: &BookmarkId) -> PlatformResult<Vec<BookmarkNode>> {
        Ok(Vec::new())
    }

    async fn bookmark_children(&self, _id: &BookmarkId) -> PlatformResult<Vec<BookmarkNode>> {
        Ok(Vec::new())
    }

    async fn bookmark_create(&self, _bookmark: NewBookmark) -> PlatformResult<BookmarkNode> {
        Err(PlatformError::Unsupported("bookmarks.create"))
    }

    async fn bookmark_search(&self, _query: &str) -> PlatformResult<Vec<BookmarkNode>> {
        Ok(Vec::new())
    }

    async fn bookmark_remove(&self, _id: &BookmarkId) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("bookmarks.remove"))
    }

    async fn bookmark_move(
        &self,
        _id: &BookmarkId,
        _parent: &BookmarkId,
    ) -> PlatformResult<BookmarkNode> {
        Err(PlatformError::Unsupported("bookmarks.move"))
    }

    async fn bookmark_all(&self) -> PlatformResult<Vec<BookmarkNode>> {
        Ok(Vec::new())
    }

    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> PlatformResult<()> {
        self.require_page(tab)?;
        let TabMessage { kind, data } = message;
        self.emit(tab, None, &kind, Value::Object(data), QueueMode::Append);
        Ok(())
    }

    async fn close_tab(&self, tab: TabId) -> PlatformResult<()> {
        self.host.close_tab(tab)?;
        self.on_close(tab);
        Ok(())
    }

    fn tab_updates(&self) -> broadcast::Receiver<TabUpdate> {
        self.updates.subscribe()
    }

    async fn window_kind(&self, _window: WindowId) -> PlatformResult<WindowKind> {
        Ok(WindowKind::Normal)
    }

    async fn set_page_icon(&self, tab: TabId, path: &str) -> PlatformResult<()> {
        self.require_page(tab)?;
        let tool_tip = if path.contains("kept") {
            "Kept with Kifi"
        } else {
            "Kifi"
        };
        self.host.set_toolbar_icon(path, tool_tip)
    }

    async fn show_page_action(&self, _tab: TabId) -> PlatformResult<()> {
        Ok(())
    }

    async fn open_popup(&self, url: &str, _width: u32, _height: u32) -> PlatformResult<PopupWindow> {
        let tab_id = self.on_open(url);
        self.host.open_tab(tab_id, url)?;
        Ok(PopupWindow {
            window_id: SAFARI_WINDOW,
            tab_id,
        })
    }

    async fn inject_script(&self, tab: TabId, path: &str) -> PlatformResult<()> {
        self.require_page(tab)?;
        self.post(
            tab,
            "api:inject",
            &json!({ "scripts": [path], "styles": [], "paths": [path] }),
        );
        Ok(())
    }

    async fn insert_css(&self, tab: TabId, path: &str) -> PlatformResult<()> {
        self.require_page(tab)?;
        self.post(
            tab,
            "api:inject",
            &json!({ "scripts": [], "styles": [path], "paths": [path] }),
        );
        Ok(())
    }
}

impl std::fmt::Debug for SafariPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafariPlatform")
            .field("pages", &self.pages.lock().expect("lock poisoned").len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safari::host::{HostCall, RecordingSafariHost};

    fn platform() -> (Arc<RecordingSafariHost>, SafariPlatform) {
        let host = Arc::new(RecordingSafariHost::new());
        let p = SafariPlatform::new(host.clone());
        (host, p)
    }

    #[tokio::test]
    async fn bookmarks_are_empty_or_unsupported() {
        let (_, p) = platform();
        assert!(p.bookmark_all().await.unwrap().is_empty());
        assert!(p.bookmark_children(&BookmarkId::root()).await.unwrap().is_empty());
        assert!(matches!(
            p.bookmark_create(NewBookmark::folder(BookmarkId::root(), "KeepIt")).await,
            Err(PlatformError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn messages_queue_until_handled() {
        let (host, p) = platform();
        let id = p.on_open("https://a.com/");
        p.send_to_tab(id, TabMessage::new("deep_link").with("link", "/m/1"))
            .await
            .unwrap();
        assert!(host.dispatched_to(id).is_empty());

        assert!(p
            .on_message(id, "api:handling", json!(["deep_link"]))
            .is_none());
        let sent = host.dispatched_to(id);
        assert_eq!(sent, vec![("deep_link".to_string(), json!({"link": "/m/1"}))]);
    }

    #[tokio::test]
    async fn navigation_and_dom_ready_publish_updates() {
        let (_, p) = platform();
        let mut rx = p.tab_updates();
        let id = p.on_open("about:blank");
        p.on_before_navigate(id, "https://b.com/page");
        p.on_message(id, "api:DOMContentLoaded", json!({"injected": {}}));

        let loading = rx.recv().await.unwrap();
        assert!(loading.is_loading());
        assert_eq!(loading.tab.id, id);
        let complete = rx.recv().await.unwrap();
        assert!(complete.is_complete());
        assert_eq!(complete.tab.url, "https://b.com/page");
    }

    #[tokio::test]
    async fn non_api_messages_are_returned() {
        let (_, p) = platform();
        let id = p.on_open("https://a.com/");
        let routed = p.on_message(id, "get_conf", json!({}));
        assert_eq!(routed, Some(("get_conf".to_string(), json!({}))));
    }

    #[tokio::test]
    async fn popup_opens_tab_and_icon_is_shared() {
        let (host, p) = platform();
        let popup = p.open_popup("http://h/authenticate/facebook", 1020, 530).await.unwrap();
        p.set_page_icon(popup.tab_id, "icons/kept.png").await.unwrap();
        let calls = host.calls();
        assert!(matches!(&calls[0], HostCall::OpenTab { url, .. } if url == "http://h/authenticate/facebook"));
        assert_eq!(
            calls[1],
            HostCall::ToolbarIcon {
                image: "icons/kept.png".into(),
                tool_tip: "Kept with Kifi".into()
            }
        );
    }

    #[tokio::test]
    async fn close_disconnects_http_pages() {
        let (host, p) = platform();
        let id = p.on_open("https://a.com/");
        p.close_tab(id).await.unwrap();
        assert!(p.page(id).is_none());
        assert_eq!(
            host.calls(),
            vec![
                HostCall::CloseTab(id),
                HostCall::Dispatch {
                    tab: id,
                    kind: "api:disconnect".into(),
                    data: Value::Null
                }
            ]
        );
    }
}
