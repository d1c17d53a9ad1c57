use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use kifi_remote::ApiCall;
use kifi_types::NewBookmark;

use crate::context::Background;
use crate::error::BackgroundResult;

/// `source` values reported with posted bookmarks.
pub mod sources {
    /// A keep made from the in-page slider.
    pub const HOVER_KEEP: &str = "HOVER_KEEP";
    /// A full upload of the local bookmark tree.
    pub const INIT_LOAD: &str = "INIT_LOAD";
}

impl Background {
    /// Create a bookmark for `url` in the public or private folder and
    /// return the created node. The post to the server runs on its own task
    /// and is not waited for.
    pub async fn add_keep(
        self: &Arc<Self>,
        url: &str,
        title: &str,
        private: bool,
    ) -> BackgroundResult<Value> {
        debug!(url, private, "adding keep");
        let info = self.resolve_folders().await?;
        let parent = info.folder_for(private).clone();
        let node = self
            .platform()
            .bookmark_create(NewBookmark::page(parent.clone(), title, url))
            .await?;
        let reply = serde_json::to_value(&node)?;

        let posted = json!({
            "parentId": parent,
            "title": title,
            "url": url,
            "isPrivate": private,
        });
        let bg = Arc::clone(self);
        tokio::spawn(async move {
            bg.post_bookmarks(vec![posted], sources::HOVER_KEEP).await;
        });
        Ok(reply)
    }

    /// Remove every local bookmark of `url` in the keep folders and tell the
    /// server. Without a session nothing happens and there is no reply.
    pub async fn remove_keep(&self, url: &str) -> BackgroundResult<Option<Value>> {
        if !self.is_logged_in() {
            info!(url, "not removing keep: no session");
            return Ok(None);
        }
        let info = self.resolve_folders().await?;
        for bm in self.platform().bookmark_search(url).await? {
            let in_keep_folder = bm.parent_id.as_ref().is_some_and(|p| info.holds(p));
            if bm.url.as_deref() == Some(url) && in_keep_folder {
                if let Err(e) = self.platform().bookmark_remove(&bm.id).await {
                    warn!(id = %bm.id, error = %e, "could not remove bookmark");
                }
            }
        }
        let resp = self
            .call(ApiCall::RemoveBookmark {
                url: url.to_string(),
            })
            .await?;
        debug!(url, response = %resp, "keep removed");
        Ok(Some(resp))
    }

    /// Move local bookmarks of `url` into the folder matching `private` and
    /// tell the server.
    pub async fn set_private(&self, url: &str, private: bool) -> BackgroundResult<Value> {
        let info = self.resolve_folders().await?;
        let to = info.folder_for(private);
        let from = info.folder_for(!private);
        for bm in self.platform().bookmark_search(url).await? {
            if bm.url.as_deref() == Some(url) && bm.parent_id.as_ref() == Some(from) {
                if let Err(e) = self.platform().bookmark_move(&bm.id, to).await {
                    warn!(id = %bm.id, error = %e, "could not move bookmark");
                }
            }
        }
        let resp = self
            .call(ApiCall::SetPrivate {
                url: url.to_string(),
                private,
            })
            .await?;
        debug!(url, private, response = %resp, "privacy set");
        Ok(resp)
    }

    /// Post bookmarks to `/bookmarks/add`. Failures are logged only.
    pub async fn post_bookmarks(&self, bookmarks: Vec<Value>, source: &str) {
        let count = bookmarks.len();
        debug!(count, source, "posting bookmarks");
        let call = ApiCall::AddBookmarks {
            bookmarks: Value::Array(bookmarks),
            source: source.to_string(),
        };
        match self.call(call).await {
            Ok(resp) => debug!(count, source, response = %resp, "bookmarks posted"),
            Err(e) => error!(count, source, error = %e, "posting bookmarks failed"),
        }
    }

    /// Post every local page bookmark.
    pub async fn post_all_bookmarks(&self, source: &str) {
        let all = match self.platform().bookmark_all().await {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "could not read bookmarks");
                return;
            }
        };
        let values = all
            .iter()
            .filter_map(|b| serde_json::to_value(b).ok())
            .collect();
        self.post_bookmarks(values, source).await;
    }

    /// Full upload requested by a page. Requires a complete stored user.
    pub async fn upload_all_bookmarks(&self) {
        if self.config().user().is_none() {
            info!("not uploading bookmarks: no user");
            return;
        }
        self.post_all_bookmarks(sources::INIT_LOAD).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use kifi_platform::PlatformAdapter;

    fn posted(h: &Harness) -> Vec<(Value, String)> {
        h.remote
            .calls_to("/bookmarks/add")
            .into_iter()
            .map(|c| match c {
                ApiCall::AddBookmarks { bookmarks, source } => (bookmarks, source),
                other => panic!("unexpected call {other:?}"),
            })
            .collect()
    }

    async fn wait_for_posts(h: &Harness, n: usize) {
        for _ in 0..100 {
            if posted(h).len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} bookmark posts");
    }

    #[tokio::test]
    async fn add_keep_files_under_privacy_folder() {
        let h = logged_in();
        let reply = h.bg.add_keep("http://a.com/", "A", true).await.unwrap();
        let info = h.bg.resolve_folders().await.unwrap();
        assert_eq!(reply["parentId"], info.private_id.as_str());
        assert_eq!(reply["url"], "http://a.com/");

        wait_for_posts(&h, 1).await;
        let posts = posted(&h);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1, "HOVER_KEEP");
        assert_eq!(posts[0].0[0]["isPrivate"], true);
        assert_eq!(posts[0].0[0]["title"], "A");
    }

    #[tokio::test]
    async fn remove_keep_needs_session() {
        let h = harness();
        assert!(h.bg.remove_keep("http://a.com/").await.unwrap().is_none());
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn remove_keep_only_touches_keep_folders() {
        let h = logged_in();
        h.remote
            .respond("/bookmarks/remove", json!({"removed": true}));
        h.bg.add_keep("http://a.com/", "A", false).await.unwrap();
        let elsewhere = h
            .platform
            .bookmark_create(NewBookmark::page("2".into(), "A", "http://a.com/"))
            .await
            .unwrap();

        let resp = h.bg.remove_keep("http://a.com/").await.unwrap();
        assert_eq!(resp, Some(json!({"removed": true})));
        let left: Vec<_> = h
            .platform
            .nodes()
            .into_iter()
            .filter(|n| n.url.as_deref() == Some("http://a.com/"))
            .collect();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, elsewhere.id);
    }

    #[tokio::test]
    async fn set_private_moves_between_folders() {
        let h = logged_in();
        h.bg.add_keep("http://a.com/", "A", false).await.unwrap();
        h.bg.set_private("http://a.com/", true).await.unwrap();

        let info = h.bg.resolve_folders().await.unwrap();
        let node = h
            .platform
            .nodes()
            .into_iter()
            .find(|n| n.url.as_deref() == Some("http://a.com/"))
            .unwrap();
        assert_eq!(node.parent_id, Some(info.private_id));
        assert_eq!(
            h.remote.calls_to("/bookmarks/private"),
            vec![ApiCall::SetPrivate {
                url: "http://a.com/".into(),
                private: true
            }]
        );
    }

    #[tokio::test]
    async fn upload_requires_complete_user() {
        let h = harness();
        h.bg.upload_all_bookmarks().await;
        assert!(posted(&h).is_empty());

        h.bg.config().set_user(&session().user()).unwrap();
        h.platform
            .bookmark_create(NewBookmark::page("1".into(), "B", "http://b.com/"))
            .await
            .unwrap();
        h.bg.upload_all_bookmarks().await;
        let posts = posted(&h);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1, "INIT_LOAD");
        assert_eq!(posts[0].0[0]["url"], "http://b.com/");
    }

    #[tokio::test]
    async fn post_failure_is_absorbed() {
        let h = logged_in();
        h.remote.fail("/bookmarks/add");
        let reply = h.bg.add_keep("http://a.com/", "A", false).await;
        assert!(reply.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn add_keep_replies_while_post_hangs() {
        let h = logged_in();
        h.remote.stall("/bookmarks/add");
        let reply = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            h.bg.add_keep("http://a.com/", "A", false),
        )
        .await;
        let node = reply.expect("reply before the post completes").unwrap();
        assert_eq!(node["url"], "http://a.com/");
    }
}
