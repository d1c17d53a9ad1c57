use std::fmt;

use serde_json::{json, Value};

use kifi_protocol::endpoints;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

/// Every request the background sends to the API server.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    /// Silent login handshake.
    Start {
        installation: Option<String>,
        version: String,
        agent: String,
    },
    /// Telemetry batch envelope.
    PostEvents { batch: Value },
    AddBookmarks { bookmarks: Value, source: String },
    RemoveBookmark { url: String },
    SetPrivate { url: String, private: bool },
    CheckBookmark { uri: String },
    Search {
        term: String,
        max_hits: u64,
        last_uui: Option<String>,
        context: Option<String>,
        kifi_version: String,
    },
    Follow { url: String, follow: bool },
    PostComment { body: Value },
    /// Public comments or message threads, either one by id or all for a page.
    Comments {
        public: bool,
        comment_id: Option<String>,
        url: Option<String>,
    },
    Friends,
    SliderInfo { url: String },
    SliderUpdates { url: String },
}

impl ApiCall {
    pub fn method(&self) -> Method {
        match self {
            Self::CheckBookmark { .. }
            | Self::Search { .. }
            | Self::Comments { .. }
            | Self::Friends
            | Self::SliderInfo { .. }
            | Self::SliderUpdates { .. } => Method::Get,
            Self::Follow { follow: false, .. } => Method::Delete,
            _ => Method::Post,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Start { .. } => endpoints::START.into(),
            Self::PostEvents { .. } => endpoints::EVENTS.into(),
            Self::AddBookmarks { .. } => endpoints::BOOKMARKS_ADD.into(),
            Self::RemoveBookmark { .. } => endpoints::BOOKMARKS_REMOVE.into(),
            Self::SetPrivate { .. } => endpoints::BOOKMARKS_PRIVATE.into(),
            Self::CheckBookmark { .. } => endpoints::BOOKMARKS_CHECK.into(),
            Self::Search { .. } => endpoints::SEARCH.into(),
            Self::Follow { .. } => endpoints::COMMENTS_FOLLOW.into(),
            Self::PostComment { .. } => endpoints::COMMENTS_ADD.into(),
            Self::Comments {
                public, comment_id, ..
            } => {
                let base = if *public {
                    endpoints::COMMENTS_PUBLIC
                } else {
                    endpoints::MESSAGE_THREADS
                };
                match comment_id {
                    Some(id) => format!("{base}/{id}"),
                    None => base.to_string(),
                }
            }
            Self::Friends => endpoints::FRIENDS.into(),
            Self::SliderInfo { .. } => endpoints::SLIDER.into(),
            Self::SliderUpdates { .. } => endpoints::SLIDER_UPDATES.into(),
        }
    }

    /// Query-string pairs for GET calls. Absent values are sent empty.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::CheckBookmark { uri } => vec![("uri", uri.clone())],
            Self::Search {
                term,
                max_hits,
                last_uui,
                context,
                kifi_version,
            } => vec![
                ("term", term.clone()),
                ("maxHits", max_hits.to_string()),
                ("lastUUI", last_uui.clone().unwrap_or_default()),
                ("context", context.clone().unwrap_or_default()),
                ("kifiVersion", kifi_version.clone()),
            ],
            Self::Comments {
                comment_id: None,
                url,
                ..
            } => vec![("url", url.clone().unwrap_or_default())],
            Self::SliderInfo { url } | Self::SliderUpdates { url } => vec![("url", url.clone())],
            _ => Vec::new(),
        }
    }

    /// JSON body for POST and DELETE calls.
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::Start {
                installation,
                version,
                agent,
            } => Some(json!({
                "installation": installation,
                "version": version,
                "agent": agent,
            })),
            Self::PostEvents { batch } => Some(batch.clone()),
            Self::AddBookmarks { bookmarks, source } => Some(json!({
                "bookmarks": bookmarks,
                "source": source,
            })),
            Self::RemoveBookmark { url } => Some(json!({ "url": url })),
            Self::SetPrivate { url, private } => Some(json!({ "url": url, "private": private })),
            Self::Follow { url, .. } => Some(json!({ "url": url })),
            Self::PostComment { body } => Some(body.clone()),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::PostEvents { .. } => "post_events",
            Self::AddBookmarks { .. } => "add_bookmarks",
            Self::RemoveBookmark { .. } => "remove_bookmark",
            Self::SetPrivate { .. } => "set_private",
            Self::CheckBookmark { .. } => "check_bookmark",
            Self::Search { .. } => "search",
            Self::Follow { .. } => "follow",
            Self::PostComment { .. } => "post_comment",
            Self::Comments { .. } => "comments",
            Self::Friends => "friends",
            Self::SliderInfo { .. } => "slider_info",
            Self::SliderUpdates { .. } => "slider_updates",
        }
    }
}
