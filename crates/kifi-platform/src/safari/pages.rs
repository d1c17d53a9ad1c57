use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use kifi_types::TabId;

/// How [`PageRegistry::emit`] treats a message the page is not yet handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueMode {
    /// Drop it.
    None,
    /// Append to the page's queue.
    Append,
    /// Overwrite the payload of an already queued message of the same kind,
    /// or append if there is none.
    ReplaceLatest,
}

/// What happened to an emitted message.
#[derive(Clone, Debug, PartialEq)]
pub enum EmitOutcome {
    /// Deliver now.
    Deliver { kind: String, data: Value },
    Queued,
    /// An already queued message of the same kind had its payload replaced.
    Replaced,
    /// Not handled yet and not queued.
    Dropped,
    /// The page has navigated away from the caller's URL, or is gone.
    Suppressed,
}

/// One browser tab between two navigations.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub id: TabId,
    pub url: String,
    handling: HashSet<String>,
    to_emit: Vec<(String, Value)>,
}

impl Page {
    fn new(id: TabId, url: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            handling: HashSet::new(),
            to_emit: Vec::new(),
        }
    }

    pub fn is_http(&self) -> bool {
        is_http(&self.url)
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.handling.contains(kind)
    }

    /// Messages waiting for the page to handle their kind.
    pub fn queued(&self) -> &[(String, Value)] {
        &self.to_emit
    }
}

pub(crate) fn is_http(url: &str) -> bool {
    url.starts_with("http:") || url.starts_with("https:")
}

/// `scheme://host[:port]` of an http(s) URL.
fn origin(url: &str) -> Option<&str> {
    if !is_http(url) {
        return None;
    }
    let after_scheme = url.find("://")? + 3;
    let end = url[after_scheme..]
        .find('/')
        .map(|i| after_scheme + i)
        .unwrap_or(url.len());
    Some(&url[..end])
}

/// Pages keyed by locally assigned, monotonically increasing ids.
#[derive(Debug, Default)]
pub struct PageRegistry {
    pages: HashMap<TabId, Page>,
    next_id: u64,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened tab and return its id.
    pub fn open(&mut self, url: &str) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        self.pages.insert(id, Page::new(id, url));
        debug!(%id, url, "page opened");
        id
    }

    pub fn get(&self, id: TabId) -> Option<&Page> {
        self.pages.get(&id)
    }

    /// Replace a tab's page ahead of a navigation. Returns the previous page
    /// when it was an http page, which the caller treats as unloaded.
    pub fn before_navigate(&mut self, id: TabId, url: &str) -> Option<Page> {
        let unloaded = self.remove(id);
        self.pages.insert(id, Page::new(id, url));
        debug!(%id, url, "page recreated for navigation");
        unloaded
    }

    /// Remove a tab's page. Returns it when it was an http page.
    pub fn remove(&mut self, id: TabId) -> Option<Page> {
        self.pages.remove(&id).filter(Page::is_http)
    }

    /// Route a message to a page.
    ///
    /// `expected_url` is the URL the caller believes the tab shows; if the
    /// page has since moved to a different origin the message is suppressed.
    pub fn emit(
        &mut self,
        id: TabId,
        expected_url: Option<&str>,
        kind: &str,
        data: Value,
        queue: QueueMode,
    ) -> EmitOutcome {
        let Some(page) = self.pages.get_mut(&id) else {
            warn!(%id, kind, "emit suppressed: no page");
            return EmitOutcome::Suppressed;
        };
        if let Some(expected) = expected_url {
            let same = page.url == expected
                || matches!((origin(&page.url), origin(expected)), (Some(a), Some(b)) if a == b);
            if !same {
                warn!(%id, kind, from = expected, to = %page.url, "emit suppressed: navigated");
                return EmitOutcome::Suppressed;
            }
        }
        if page.handles(kind) {
            return EmitOutcome::Deliver {
                kind: kind.to_string(),
                data,
            };
        }
        match queue {
            QueueMode::None => EmitOutcome::Dropped,
            QueueMode::ReplaceLatest => {
                if let Some(slot) = page.to_emit.iter_mut().find(|(k, _)| k == kind) {
                    slot.1 = data;
                    EmitOutcome::Replaced
                } else {
                    page.to_emit.push((kind.to_string(), data));
                    EmitOutcome::Queued
                }
            }
            QueueMode::Append => {
                page.to_emit.push((kind.to_string(), data));
                EmitOutcome::Queued
            }
        }
    }

    /// Mark `kinds` as handled by the page and return, in queue order, the
    /// queued messages that can now be delivered.
    pub fn handling(&mut self, id: TabId, kinds: &[String]) -> Vec<(String, Value)> {
        let Some(page) = self.pages.get_mut(&id) else {
            return Vec::new();
        };
        page.handling.extend(kinds.iter().cloned());
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut page.to_emit)
            .into_iter()
            .partition(|(k, _)| page.handling.contains(k));
        page.to_emit = waiting;
        ready
    }

    /// Pages currently showing an http(s) URL.
    pub fn http_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values().filter(|p| p.is_http())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_increment() {
        let mut r = PageRegistry::new();
        assert_eq!(r.open("https://a.com"), TabId(0));
        assert_eq!(r.open("https://b.com"), TabId(1));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn navigation_recreates_page() {
        let mut r = PageRegistry::new();
        let id = r.open("https://a.com/x");
        r.handling(id, &["kifi:slider".to_string()]);
        let unloaded = r.before_navigate(id, "https://b.com/").unwrap();
        assert_eq!(unloaded.url, "https://a.com/x");
        let page = r.get(id).unwrap();
        assert_eq!(page.url, "https://b.com/");
        assert!(!page.handles("kifi:slider"));

        assert!(r.before_navigate(id, "about:blank").is_some());
        assert!(r.before_navigate(id, "https://c.com").is_none());
    }

    #[test]
    fn emit_delivers_when_handled() {
        let mut r = PageRegistry::new();
        let id = r.open("https://a.com");
        r.handling(id, &["deep_link".to_string()]);
        assert_eq!(
            r.emit(id, None, "deep_link", json!("loc"), QueueMode::None),
            EmitOutcome::Deliver {
                kind: "deep_link".into(),
                data: json!("loc")
            }
        );
    }

    #[test]
    fn queue_then_flush_in_order() {
        let mut r = PageRegistry::new();
        let id = r.open("https://a.com");
        assert_eq!(r.emit(id, None, "a", json!(1), QueueMode::Append), EmitOutcome::Queued);
        assert_eq!(r.emit(id, None, "b", json!(2), QueueMode::Append), EmitOutcome::Queued);
        assert_eq!(r.emit(id, None, "a", json!(3), QueueMode::Append), EmitOutcome::Queued);
        assert_eq!(r.emit(id, None, "c", json!(4), QueueMode::None), EmitOutcome::Dropped);

        let ready = r.handling(id, &["a".to_string()]);
        assert_eq!(ready, vec![("a".to_string(), json!(1)), ("a".to_string(), json!(3))]);
        assert_eq!(r.get(id).unwrap().queued(), &[("b".to_string(), json!(2))]);
    }

    #[test]
    fn replace_latest_overwrites_payload() {
        let mut r = PageRegistry::new();
        let id = r.open("https://a.com");
        r.emit(id, None, "count", json!(1), QueueMode::ReplaceLatest);
        assert_eq!(
            r.emit(id, None, "count", json!(2), QueueMode::ReplaceLatest),
            EmitOutcome::Replaced
        );
        assert_eq!(r.handling(id, &["count".to_string()]), vec![("count".to_string(), json!(2))]);
    }

    #[test]
    fn emit_suppressed_after_host_change() {
        let mut r = PageRegistry::new();
        let id = r.open("https://a.com/one");
        r.handling(id, &["k".to_string()]);
        assert!(matches!(
            r.emit(id, Some("https://a.com/two"), "k", json!(null), QueueMode::None),
            EmitOutcome::Deliver { .. }
        ));
        r.before_navigate(id, "https://b.com/");
        assert_eq!(
            r.emit(id, Some("https://a.com/one"), "k", json!(null), QueueMode::Append),
            EmitOutcome::Suppressed
        );
        assert_eq!(
            r.emit(TabId(99), None, "k", json!(null), QueueMode::Append),
            EmitOutcome::Suppressed
        );
    }

    #[test]
    fn origin_parsing() {
        assert_eq!(origin("https://a.com:8080/x?y"), Some("https://a.com:8080"));
        assert_eq!(origin("http://a.com"), Some("http://a.com"));
        assert_eq!(origin("about:blank"), None);
    }
}
