use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use kifi_protocol::{Decoded, ExtensionMessage, MessageCodec};
use kifi_types::Tab;

use crate::context::Background;
use crate::error::BackgroundResult;

/// Who sent an inbound message. Extension pages have no tab.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageSender {
    pub tab: Option<Tab>,
}

impl MessageSender {
    pub fn tab(tab: Tab) -> Self {
        Self { tab: Some(tab) }
    }

    pub fn page() -> Self {
        Self { tab: None }
    }
}

/// How a dispatched message is answered.
#[derive(Debug)]
pub enum Reply {
    /// Answered before `dispatch` returned.
    Now(Value),
    /// Answered by a spawned handler. The sender is dropped without a value
    /// when the handler fails or stays silent.
    Later(oneshot::Receiver<Value>),
    Silent,
}

impl Reply {
    /// Wait for the reply, if any.
    pub async fn into_value(self) -> Option<Value> {
        match self {
            Self::Now(v) => Some(v),
            Self::Later(rx) => rx.await.ok(),
            Self::Silent => None,
        }
    }
}

/// Single entry point for messages from content scripts and extension pages.
///
/// Unknown or malformed messages are logged and dropped. Handler errors
/// never reach the sender; it just gets no reply. Handlers run
/// independently with no ordering between messages.
#[derive(Clone, Debug)]
pub struct MessageRouter {
    background: Arc<Background>,
}

impl MessageRouter {
    pub fn new(background: Arc<Background>) -> Self {
        Self { background }
    }

    pub fn background(&self) -> &Arc<Background> {
        &self.background
    }

    /// Route one raw message. Must be called inside a tokio runtime.
    pub fn dispatch(&self, raw: &Value, sender: &MessageSender) -> Reply {
        let message = match MessageCodec::decode(raw) {
            Decoded::Message(m) => m,
            Decoded::Unknown { kind } => {
                warn!(kind = ?kind, "ignoring unknown message");
                return Reply::Silent;
            }
            Decoded::Malformed { kind, reason } => {
                warn!(%kind, %reason, "ignoring malformed message");
                return Reply::Silent;
            }
        };
        self.route(message, sender)
    }

    /// Route an already decoded message.
    pub fn route(&self, message: ExtensionMessage, sender: &MessageSender) -> Reply {
        let kind = message.type_name();
        let tab = sender.tab.clone();
        debug!(kind, tab = ?tab.as_ref().map(|t| t.id), "handling message");
        if message.needs_tab() && tab.is_none() {
            warn!(kind, "message needs a tab but has none");
            return Reply::Silent;
        }
        let tab_url = tab.as_ref().map(|t| t.url.clone()).unwrap_or_default();
        let bg = Arc::clone(&self.background);

        use ExtensionMessage as M;
        match message {
            M::GetConf => Reply::Now(bg.conf_snapshot()),
            M::SetConf { key, value } => {
                if let Err(e) = bg.config().set_value(&key, &value) {
                    error!(%key, error = %e, "set_conf failed");
                }
                Reply::Now(Value::Null)
            }
            M::RemoveConf { key } => {
                if let Err(e) = bg.config().remove(&key) {
                    error!(%key, error = %e, "remove_conf failed");
                }
                Reply::Now(Value::Null)
            }
            M::LogEvent { args } => {
                bg.log_event_args(&args);
                Reply::Silent
            }
            M::UploadAllBookmarks => {
                tokio::spawn(async move { bg.upload_all_bookmarks().await });
                Reply::Silent
            }
            M::Follow { follow } => {
                tokio::spawn(async move { bg.follow(&tab_url, follow).await });
                Reply::Silent
            }
            M::SetPageIcon { is_kept } => {
                let Some(tab) = tab else { return Reply::Silent };
                tokio::spawn(async move {
                    if let Err(e) = bg.set_page_icon(&tab, is_kept).await {
                        warn!(tab = %tab.id, error = %e, "set_page_icon failed");
                    }
                });
                Reply::Silent
            }
            M::PageLoad => {
                let Some(tab) = tab else { return Reply::Silent };
                tokio::spawn(async move {
                    if let Err(e) = bg.on_page_load(&tab).await {
                        warn!(tab = %tab.id, error = %e, "page load flow failed");
                    }
                });
                Reply::Silent
            }
            M::AddDeepLinkListener { link } => {
                let Some(tab) = tab else { return Reply::Silent };
                bg.add_deep_link_listener(link, tab.id);
                Reply::Silent
            }
            M::LogIn => later(kind, async move {
                let session = bg.authenticate().await?;
                Ok(Some(serde_json::to_value(session)?))
            }),
            M::LogOut => later(kind, async move {
                bg.deauthenticate().await?;
                Ok(Some(Value::Null))
            }),
            M::GetKeeps {
                query,
                last_uuid,
                context,
            } => later(kind, async move {
                Ok(Some(bg.search(&query, last_uuid, context).await?))
            }),
            M::AddBookmarks {
                url,
                title,
                private,
            } => later(kind, async move {
                Ok(Some(bg.add_keep(&url, &title, private).await?))
            }),
            M::Unkeep { url } => later(kind, async move { bg.remove_keep(&url).await }),
            M::SetPrivate { url, private } => later(kind, async move {
                Ok(Some(bg.set_private(&url, private).await?))
            }),
            M::Require { scripts, injected } => {
                let Some(tab) = tab else { return Reply::Silent };
                later(kind, async move {
                    Ok(Some(bg.require(tab.id, &scripts, injected).await?))
                })
            }
            M::GetSliderInfo => later(kind, async move {
                Ok(Some(bg.slider_info(&tab_url).await?))
            }),
            M::GetSliderUpdates => later(kind, async move {
                Ok(Some(bg.slider_updates(&tab_url).await?))
            }),
            M::GetComments { kind: which, comment_id } => {
                let url = tab.map(|t| t.url);
                later(kind, async move {
                    Ok(Some(bg.comments(which.as_deref(), comment_id, url).await?))
                })
            }
            M::PostComment(comment) => later(kind, async move {
                Ok(Some(bg.post_comment(&comment).await?))
            }),
            M::GetFriends => later(kind, async move { Ok(Some(bg.friends().await?)) }),
        }
    }
}

/// Run `handler` on its own task and answer through a oneshot.
fn later<F>(kind: &'static str, handler: F) -> Reply
where
    F: Future<Output = BackgroundResult<Option<Value>>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match handler.await {
            Ok(Some(value)) => {
                if tx.send(value).is_err() {
                    debug!(kind, "reply receiver gone");
                }
            }
            Ok(None) => debug!(kind, "handler finished without reply"),
            Err(e) => error!(kind, error = %e, "handler failed"),
        }
    });
    Reply::Later(rx)
}
