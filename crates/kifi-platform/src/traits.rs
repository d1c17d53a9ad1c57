use async_trait::async_trait;
use tokio::sync::broadcast;

use kifi_types::{
    BookmarkId, BookmarkNode, NewBookmark, TabId, TabMessage, TabUpdate, WindowId, WindowKind,
};

use crate::error::PlatformResult;

/// Window and tab created by [`PlatformAdapter::open_popup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopupWindow {
    pub window_id: WindowId,
    pub tab_id: TabId,
}

/// Browser host operations needed by the background page.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Look up a bookmark by id. An empty result means it no longer exists.
    async fn bookmark_get(&self, id: &BookmarkId) -> PlatformResult<Vec<BookmarkNode>>;

    /// Direct children of a folder, in display order.
    async fn bookmark_children(&self, id: &BookmarkId) -> PlatformResult<Vec<BookmarkNode>>;

    async fn bookmark_create(&self, bookmark: NewBookmark) -> PlatformResult<BookmarkNode>;

    /// Bookmarks whose title or URL contains `query`.
    async fn bookmark_search(&self, query: &str) -> PlatformResult<Vec<BookmarkNode>>;

    async fn bookmark_remove(&self, id: &BookmarkId) -> PlatformResult<()>;

    async fn bookmark_move(
        &self,
        id: &BookmarkId,
        parent: &BookmarkId,
    ) -> PlatformResult<BookmarkNode>;

    /// Every page bookmark in the tree (folders excluded).
    async fn bookmark_all(&self) -> PlatformResult<Vec<BookmarkNode>>;

    /// Post a message to the content script of a tab.
    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> PlatformResult<()>;

    async fn close_tab(&self, tab: TabId) -> PlatformResult<()>;

    /// Subscribe to tab status and URL changes.
    fn tab_updates(&self) -> broadcast::Receiver<TabUpdate>;

    async fn window_kind(&self, window: WindowId) -> PlatformResult<WindowKind>;

    async fn set_page_icon(&self, tab: TabId, path: &str) -> PlatformResult<()>;

    async fn show_page_action(&self, tab: TabId) -> PlatformResult<()>;

    async fn open_popup(&self, url: &str, width: u32, height: u32) -> PlatformResult<PopupWindow>;

    async fn inject_script(&self, tab: TabId, path: &str) -> PlatformResult<()>;

    async fn insert_css(&self, tab: TabId, path: &str) -> PlatformResult<()>;
}
