use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use kifi_types::{
    folders, BookmarkId, BookmarkNode, NewBookmark, Tab, TabId, TabMessage, TabStatus, TabUpdate,
    WindowId, WindowKind,
};

use crate::error::{PlatformError, PlatformResult};
use crate::traits::{PlatformAdapter, PopupWindow};

const UPDATE_CAPACITY: usize = 256;

/// Something the background asked the host to do to a tab.
#[derive(Clone, Debug, PartialEq)]
pub enum TabAction {
    Message(TabMessage),
    SetIcon(String),
    ShowPageAction,
    InjectScript(String),
    InsertCss(String),
    Closed,
}

#[derive(Default)]
struct State {
    /// Bookmark nodes in creation order; children are listed in this order.
    nodes: Vec<BookmarkNode>,
    next_bookmark: u64,
    tabs: HashMap<TabId, Tab>,
    windows: HashMap<WindowId, WindowKind>,
    next_tab: u64,
    next_window: u64,
    actions: Vec<(TabId, TabAction)>,
    popups: Vec<(String, u32, u32)>,
    popup_tabs: Vec<TabId>,
}

impl State {
    fn add_node(&mut self, parent: Option<BookmarkId>, title: &str, url: Option<String>) -> BookmarkNode {
        let node = BookmarkNode {
            id: BookmarkId::new(self.next_bookmark.to_string()),
            parent_id: parent,
            title: title.to_string(),
            url,
        };
        self.next_bookmark += 1;
        self.nodes.push(node.clone());
        node
    }

    fn node(&self, id: &BookmarkId) -> Option<&BookmarkNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    fn new_window(&mut self, kind: WindowKind) -> WindowId {
        self.next_window += 1;
        let id = WindowId(self.next_window);
        self.windows.insert(id, kind);
        id
    }

    fn new_tab(&mut self, window: WindowId, url: &str) -> Tab {
        self.next_tab += 1;
        let tab = Tab::new(TabId(self.next_tab), window, url);
        self.tabs.insert(tab.id, tab.clone());
        tab
    }
}

/// Chrome-shaped host held in memory.
///
/// The bookmark tree starts with the root `"0"` and, unless built with
/// [`InMemoryPlatform::without_bookmarks_bar`], a "Bookmarks Bar" and an
/// "Other Bookmarks" folder. Tabs are opened and navigated explicitly by the
/// test or embedder, which publishes the matching [`TabUpdate`]s. Every
/// action taken on a tab is recorded.
pub struct InMemoryPlatform {
    state: Mutex<State>,
    updates: broadcast::Sender<TabUpdate>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::with_top_level(&[folders::BOOKMARKS_BAR, "Other Bookmarks"])
    }

    pub fn without_bookmarks_bar() -> Self {
        Self::with_top_level(&["Other Bookmarks"])
    }

    fn with_top_level(titles: &[&str]) -> Self {
        let mut state = State::default();
        let root = state.add_node(None, "", None);
        for title in titles {
            state.add_node(Some(root.id.clone()), title, None);
        }
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            state: Mutex::new(state),
            updates,
        }
    }

    /// Open a tab in a new window of the given kind.
    pub fn open_tab(&self, url: &str, kind: WindowKind) -> Tab {
        let mut st = self.state.lock().expect("lock poisoned");
        let window = st.new_window(kind);
        st.new_tab(window, url)
    }

    pub fn tab(&self, id: TabId) -> Option<Tab> {
        self.state.lock().expect("lock poisoned").tabs.get(&id).cloned()
    }

    /// Point a tab at a new URL and publish a `loading` update.
    pub fn navigate(&self, id: TabId, url: &str) -> PlatformResult<Tab> {
        let tab = {
            let mut st = self.state.lock().expect("lock poisoned");
            let tab = st.tabs.get_mut(&id).ok_or(PlatformError::TabNotFound(id))?;
            tab.url = url.to_string();
            tab.clone()
        };
        let _ = self.updates.send(TabUpdate {
            tab: tab.clone(),
            status: Some(TabStatus::Loading),
            url_changed: Some(url.to_string()),
        });
        Ok(tab)
    }

    /// Publish a `complete` update for a tab's current URL.
    pub fn complete(&self, id: TabId) -> PlatformResult<Tab> {
        let tab = self.tab(id).ok_or(PlatformError::TabNotFound(id))?;
        let _ = self.updates.send(TabUpdate::status(tab.clone(), TabStatus::Complete));
        Ok(tab)
    }

    /// Publish an arbitrary update.
    pub fn publish(&self, update: TabUpdate) {
        let _ = self.updates.send(update);
    }

    /// Every action recorded so far, in order.
    pub fn actions(&self) -> Vec<(TabId, TabAction)> {
        self.state.lock().expect("lock poisoned").actions.clone()
    }

    /// Messages posted to one tab.
    pub fn messages_to(&self, tab: TabId) -> Vec<TabMessage> {
        self.actions()
            .into_iter()
            .filter_map(|(t, a)| match a {
                TabAction::Message(m) if t == tab => Some(m),
                _ => None,
            })
            .collect()
    }

    /// `(url, width, height)` of every popup opened.
    pub fn popups(&self) -> Vec<(String, u32, u32)> {
        self.state.lock().expect("lock poisoned").popups.clone()
    }

    /// Tabs created by popups, oldest first.
    pub fn popup_tabs(&self) -> Vec<TabId> {
        self.state.lock().expect("lock poisoned").popup_tabs.clone()
    }

    /// Every node in the tree, root included.
    pub fn nodes(&self) -> Vec<BookmarkNode> {
        self.state.lock().expect("lock poisoned").nodes.clone()
    }

    fn record(&self, tab: TabId, action: TabAction) -> PlatformResult<()> {
        let mut st = self.state.lock().expect("lock poisoned");
        if !st.tabs.contains_key(&tab) {
            return Err(PlatformError::TabNotFound(tab));
        }
        st.actions.push((tab, action));
        Ok(())
    }
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformAdapter for InMemoryPlatform {
    async fn bookmark_get(&self, id: &BookmarkId) -> PlatformResult<Vec<BookmarkNode>> {
        let st = self.state.lock().expect("lock poisoned");
        Ok(st.node(id).cloned().into_iter().collect())
    }

    async fn bookmark_children(&self, id: &BookmarkId) -> PlatformResult<Vec<BookmarkNode>> {
        let st = self.state.lock().expect("lock poisoned");
        if st.node(id).is_none() {
            return Err(PlatformError::BookmarkNotFound(id.clone()));
        }
        Ok(st
            .nodes
            .iter()
            .filter(|n| n.parent_id.as_ref() == Some(id))
            .cloned()
            .collect())
    }

    async fn bookmark_create(&self, bookmark: NewBookmark) -> PlatformResult<BookmarkNode> {
        let mut st = self.state.lock().expect("lock poisoned");
        if st.node(&bookmark.parent_id).is_none() {
            return Err(PlatformError::BookmarkNotFound(bookmark.parent_id));
        }
        let node = st.add_node(Some(bookmark.parent_id), &bookmark.title, bookmark.url);
        debug!(id = %node.id, title = %node.title, "bookmark created");
        Ok(node)
    }

    async fn bookmark_search(&self, query: &str) -> PlatformResult<Vec<BookmarkNode>> {
        let st = self.state.lock().expect("lock poisoned");
        Ok(st
            .nodes
            .iter()
            .filter(|n| n.parent_id.is_some())
            .filter(|n| {
                n.title.contains(query) || n.url.as_deref().is_some_and(|u| u.contains(query))
            })
            .cloned()
            .collect())
    }

    async fn bookmark_remove(&self, id: &BookmarkId) -> PlatformResult<()> {
        let mut st = self.state.lock().expect("lock poisoned");
        let before = st.nodes.len();
        st.nodes.retain(|n| n.id != *id);
        if st.nodes.len() == before {
            return Err(PlatformError::BookmarkNotFound(id.clone()));
        }
        Ok(())
    }

    async fn bookmark_move(
        &self,
        id: &BookmarkId,
        parent: &BookmarkId,
    ) -> PlatformResult<BookmarkNode> {
        let mut st = self.state.lock().expect("lock poisoned");
        if st.node(parent).is_none() {
            return Err(PlatformError::BookmarkNotFound(parent.clone()));
        }
        let node = st
            .nodes
            .iter_mut()
            .find(|n| n.id == *id)
            .ok_or_else(|| PlatformError::BookmarkNotFound(id.clone()))?;
        node.parent_id = Some(parent.clone());
        Ok(node.clone())
    }

    async fn bookmark_all(&self) -> PlatformResult<Vec<BookmarkNode>> {
        let st = self.state.lock().expect("lock poisoned");
        Ok(st.nodes.iter().filter(|n| !n.is_folder()).cloned().collect())
    }

    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> PlatformResult<()> {
        self.record(tab, TabAction::Message(message))
    }

    async fn close_tab(&self, tab: TabId) -> PlatformResult<()> {
        self.record(tab, TabAction::Closed)?;
        self.state.lock().expect("lock poisoned").tabs.remove(&tab);
        Ok(())
    }

    fn tab_updates(&self) -> broadcast::Receiver<TabUpdate> {
        self.updates.subscribe()
    }

    async fn window_kind(&self, window: WindowId) -> PlatformResult<WindowKind> {
        let st = self.state.lock().expect("lock poisoned");
        st.windows
            .get(&window)
            .copied()
            .ok_or_else(|| PlatformError::Host(format!("no window {}", window.0)))
    }

    async fn set_page_icon(&self, tab: TabId, path: &str) -> PlatformResult<()> {
        self.record(tab, TabAction::SetIcon(path.to_string()))
    }

    async fn show_page_action(&self, tab: TabId) -> PlatformResult<()> {
        self.record(tab, TabAction::ShowPageAction)
    }

    async fn open_popup(&self, url: &str, width: u32, height: u32) -> PlatformResult<PopupWindow> {
        let mut st = self.state.lock().expect("lock poisoned");
        let window_id = st.new_window(WindowKind::Popup);
        let tab = st.new_tab(window_id, url);
        st.popups.push((url.to_string(), width, height));
        st.popup_tabs.push(tab.id);
        Ok(PopupWindow {
            window_id,
            tab_id: tab.id,
        })
    }

    async fn inject_script(&self, tab: TabId, path: &str) -> PlatformResult<()> {
        self.record(tab, TabAction::InjectScript(path.to_string()))
    }

    async fn insert_css(&self, tab: TabId, path: &str) -> PlatformResult<()> {
        self.record(tab, TabAction::InsertCss(path.to_string()))
    }
}

impl std::fmt::Debug for InMemoryPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.lock().expect("lock poisoned");
        f.debug_struct("InMemoryPlatform")
            .field("bookmarks", &st.nodes.len())
            .field("tabs", &st.tabs.len())
            .finish()
    }
}
