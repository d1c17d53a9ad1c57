use serde_json::{json, Value};
use tracing::{debug, info, warn};

use kifi_protocol::PostComment;
use kifi_remote::ApiCall;
use kifi_telemetry::EventFamily;

use crate::context::Background;
use crate::error::BackgroundResult;

impl Background {
    /// Search keeps.
    ///
    /// Replies `{session, searchResults, userConfig}`. Logged out or an
    /// empty query gives no results without a server call, and a query
    /// listed in the settings is answered from there.
    pub async fn search(
        &self,
        query: &str,
        last_uuid: Option<String>,
        context: Option<String>,
    ) -> BackgroundResult<Value> {
        let config = self.config().get();
        self.events().record(EventFamily::Search, "newSearch");

        let reply = |results: Value| {
            json!({
                "session": self.session_json(),
                "searchResults": results,
                "userConfig": &config,
            })
        };

        if !self.is_logged_in() {
            debug!("search without session");
            return Ok(reply(json!([])));
        }
        if let Some(magic) = self.settings().magic_query(query) {
            info!(query, "answering canned query");
            return Ok(reply(magic.results.clone()));
        }
        if query.is_empty() {
            return Ok(reply(json!([])));
        }

        let call = ApiCall::Search {
            term: query.to_string(),
            max_hits: config.max_res.saturating_mul(2),
            last_uui: last_uuid,
            context,
            kifi_version: self.settings().version.clone(),
        };
        let results = self.remote().call(&config.server, &call).await?;
        debug!(query, "search answered");
        Ok(reply(results))
    }

    /// Slider info for a page, with the session attached.
    pub async fn slider_info(&self, url: &str) -> BackgroundResult<Value> {
        let mut info = self
            .call(ApiCall::SliderInfo {
                url: url.to_string(),
            })
            .await?;
        if let Value::Object(map) = &mut info {
            map.insert("session".into(), self.session_json());
        }
        Ok(info)
    }

    pub async fn slider_updates(&self, url: &str) -> BackgroundResult<Value> {
        Ok(self
            .call(ApiCall::SliderUpdates {
                url: url.to_string(),
            })
            .await?)
    }

    /// Public comments or message threads: one by id, or all for `url`.
    pub async fn comments(
        &self,
        kind: Option<&str>,
        comment_id: Option<String>,
        url: Option<String>,
    ) -> BackgroundResult<Value> {
        let call = ApiCall::Comments {
            public: kind == Some("public"),
            url: if comment_id.is_none() { url } else { None },
            comment_id,
        };
        Ok(self.call(call).await?)
    }

    pub async fn post_comment(&self, comment: &PostComment) -> BackgroundResult<Value> {
        debug!(url = %comment.url, "posting comment");
        let body = serde_json::to_value(comment)?;
        Ok(self.call(ApiCall::PostComment { body }).await?)
    }

    pub async fn friends(&self) -> BackgroundResult<Value> {
        Ok(self.call(ApiCall::Friends).await?)
    }

    /// Follow or unfollow the comments on `url`. The response is only logged.
    pub async fn follow(&self, url: &str, follow: bool) {
        let call = ApiCall::Follow {
            url: url.to_string(),
            follow,
        };
        match self.call(call).await {
            Ok(resp) => debug!(url, follow, response = %resp, "follow updated"),
            Err(e) => warn!(url, follow, error = %e, "follow failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use kifi_config::{BackgroundSettings, MagicQuery};
    use kifi_platform::InMemoryPlatform;
    use kifi_remote::Method;

    #[tokio::test]
    async fn search_without_session_is_empty() {
        let h = harness();
        let v = h.bg.search("rust", None, None).await.unwrap();
        assert_eq!(v["session"], Value::Null);
        assert_eq!(v["searchResults"], json!([]));
        assert_eq!(v["userConfig"]["max_res"], 5);
        assert_eq!(h.remote.call_count(), 0);
        assert_eq!(h.bg.events().snapshot()[0].event_name, "newSearch");
    }

    #[tokio::test]
    async fn search_queries_server_with_double_max_res() {
        let h = logged_in();
        h.remote.respond("/search", json!({"hits": [1, 2]}));
        let v = h
            .bg
            .search("rust", Some("u-9".into()), Some("ctx".into()))
            .await
            .unwrap();
        assert_eq!(v["searchResults"], json!({"hits": [1, 2]}));
        assert_eq!(v["session"]["userId"], "u-1");

        match &h.remote.calls_to("/search")[0] {
            ApiCall::Search {
                term,
                max_hits,
                last_uui,
                context,
                ..
            } => {
                assert_eq!(term, "rust");
                assert_eq!(*max_hits, 10);
                assert_eq!(last_uui.as_deref(), Some("u-9"));
                assert_eq!(context.as_deref(), Some("ctx"));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn huge_max_res_saturates_max_hits() {
        let h = logged_in();
        h.bg.config()
            .set_value("max_res", &json!("18446744073709551615"))
            .unwrap();
        h.bg.search("rust", None, None).await.unwrap();
        match &h.remote.calls_to("/search")[0] {
            ApiCall::Search { max_hits, .. } => assert_eq!(*max_hits, u64::MAX),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_query_skips_server() {
        let h = logged_in();
        let v = h.bg.search("", None, None).await.unwrap();
        assert_eq!(v["searchResults"], json!([]));
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn magic_query_short_circuits() {
        let settings = BackgroundSettings {
            magic_queries: vec![MagicQuery {
                query: "kifi".into(),
                results: json!([{"title": "Kifi"}]),
            }],
            ..Default::default()
        };
        let h = harness_with(InMemoryPlatform::new(), settings);
        h.bg.set_session(Some(session()));
        let v = h.bg.search("kifi", None, None).await.unwrap();
        assert_eq!(v["searchResults"], json!([{"title": "Kifi"}]));
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn slider_info_carries_session() {
        let h = logged_in();
        h.remote.respond("/users/slider", json!({"kept": false}));
        let v = h.bg.slider_info("http://a/").await.unwrap();
        assert_eq!(v["kept"], false);
        assert_eq!(v["session"]["name"], "Ada Lovelace");
    }

    #[tokio::test]
    async fn comments_by_id_or_url() {
        let h = logged_in();
        h.bg.comments(Some("public"), Some("c-1".into()), Some("http://a/".into()))
            .await
            .unwrap();
        h.bg.comments(Some("message"), None, Some("http://a/".into()))
            .await
            .unwrap();
        let calls: Vec<_> = h.remote.calls().into_iter().map(|(_, c)| c).collect();
        assert_eq!(calls[0].path(), "/comments/public/c-1");
        assert!(calls[0].query().is_empty());
        assert_eq!(calls[1].path(), "/messages/threads");
        assert_eq!(calls[1].query(), vec![("url", "http://a/".to_string())]);
    }

    #[tokio::test]
    async fn unfollow_uses_delete() {
        let h = logged_in();
        h.bg.follow("http://a/", false).await;
        let calls = h.remote.calls_to("/comments/follow");
        assert_eq!(calls[0].method(), Method::Delete);
    }
}
