//! Native-messaging host: one framed JSON message in, one framed reply out.

use std::io::{Read, Write};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use kifi_background::{MessageRouter, MessageSender};
use kifi_platform::{InMemoryPlatform, PlatformAdapter};
use kifi_protocol::frame::{read_frame, write_frame};
use kifi_protocol::{ProtocolError, ProtocolResult};
use kifi_types::WindowKind;

/// Optional field naming the page a message came from. When present the
/// message is routed as if sent by a tab showing that URL.
pub const TAB_URL_FIELD: &str = "tabUrl";

/// Longest wait for one reply. A request still pending after this answers
/// `null` so later requests are not held up behind it.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Serve frames from `reader` until it ends, writing one reply per request
/// in order. Silent handlers, replies slower than [`REPLY_TIMEOUT`], and
/// frames that are not JSON answer `null`. Returns the number served.
///
/// A truncated or oversized frame, or a failed read or write, ends the loop
/// with an error since the stream can no longer be trusted.
pub async fn serve<R, W>(
    router: &MessageRouter,
    platform: &InMemoryPlatform,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<usize>
where
    R: Read + Send + 'static,
    W: Write,
{
    let mut frames = spawn_reader(reader);
    let mut served = 0;
    while let Some(frame) = frames.recv().await {
        let raw = match frame {
            Ok(raw) => raw,
            Err(ProtocolError::Deserialization(reason)) => {
                warn!(%reason, "frame is not JSON, answering null");
                write_frame(writer, &Value::Null)?;
                served += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let tab = raw
            .get(TAB_URL_FIELD)
            .and_then(Value::as_str)
            .map(|url| platform.open_tab(url, WindowKind::Normal));
        let sender = match &tab {
            Some(tab) => MessageSender::tab(tab.clone()),
            None => MessageSender::page(),
        };
        let pending = router.dispatch(&raw, &sender).into_value();
        let reply = match tokio::time::timeout(REPLY_TIMEOUT, pending).await {
            Ok(reply) => reply.unwrap_or(Value::Null),
            Err(_) => {
                warn!(timeout = ?REPLY_TIMEOUT, "no reply in time, answering null");
                Value::Null
            }
        };
        write_frame(writer, &reply)?;
        served += 1;

        if let Some(tab) = tab {
            if let Err(e) = platform.close_tab(tab.id).await {
                debug!(tab = %tab.id, error = %e, "could not close request tab");
            }
        }
    }
    debug!(served, "input closed");
    Ok(served)
}

/// Blocking reads happen on their own thread. A frame that is not JSON has
/// been read in full, so reading carries on after it.
fn spawn_reader<R>(mut reader: R) -> mpsc::Receiver<ProtocolResult<Value>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || loop {
        match read_frame(&mut reader) {
            Ok(Some(value)) => {
                if tx.blocking_send(Ok(value)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e @ ProtocolError::Deserialization(_)) => {
                if tx.blocking_send(Err(e)).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "unreadable frame");
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use kifi_background::Background;
    use kifi_config::{BackgroundSettings, ConfigStore};
    use kifi_platform::TabAction;
    use kifi_protocol::endpoints;
    use kifi_protocol::frame::encode;
    use kifi_remote::InMemoryRemote;
    use kifi_store::InMemoryKeyValueStore;
    use kifi_types::TabId;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::Arc;

    fn setup() -> (MessageRouter, Arc<InMemoryPlatform>) {
        let (router, platform, _) = setup_with_remote();
        (router, platform)
    }

    fn setup_with_remote() -> (MessageRouter, Arc<InMemoryPlatform>, Arc<InMemoryRemote>) {
        let platform = Arc::new(InMemoryPlatform::new());
        let remote = Arc::new(InMemoryRemote::new());
        let bg = Background::new(
            ConfigStore::new(Arc::new(InMemoryKeyValueStore::new())),
            platform.clone(),
            remote.clone(),
            BackgroundSettings::default(),
        );
        (MessageRouter::new(Arc::new(bg)), platform, remote)
    }

    fn input(messages: &[Value]) -> Cursor<Vec<u8>> {
        let mut buf = Vec::new();
        for m in messages {
            buf.extend(encode(m).unwrap());
        }
        Cursor::new(buf)
    }

    fn replies(out: Vec<u8>) -> Vec<Value> {
        let mut cursor = Cursor::new(out);
        let mut all = Vec::new();
        while let Some(v) = read_frame(&mut cursor).unwrap() {
            all.push(v);
        }
        all
    }

    #[tokio::test]
    async fn one_reply_per_request_in_order() {
        let (router, platform) = setup();
        let reader = input(&[
            json!({"type": "get_conf"}),
            json!({"type": "no_such_type"}),
            json!({"type": "set_conf", "key": "max_res", "value": 7}),
            json!({"type": "get_conf"}),
        ]);
        let mut out = Vec::new();
        let served = serve(&router, &platform, reader, &mut out).await.unwrap();
        assert_eq!(served, 4);

        let replies = replies(out);
        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0]["config"]["max_res"], json!(5));
        assert_eq!(replies[1], Value::Null);
        assert_eq!(replies[2], Value::Null);
        assert_eq!(replies[3]["config"]["max_res"], json!(7));
    }

    #[tokio::test]
    async fn tab_url_routes_from_a_tab() {
        let (router, platform) = setup();
        let reader = input(&[json!({
            "type": "require",
            "scripts": ["scripts/a.js"],
            "tabUrl": "http://example.com/"
        })]);
        let mut out = Vec::new();
        serve(&router, &platform, reader, &mut out).await.unwrap();

        assert_eq!(replies(out), vec![json!({"scripts/a.js": true})]);
        let actions = platform.actions();
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0].1, TabAction::InjectScript(_)));
        assert_eq!(actions[1].1, TabAction::Closed);
        assert!(platform.tab(actions[0].0).is_none());
    }

    #[tokio::test]
    async fn request_tabs_are_closed_after_each_reply() {
        let (router, platform) = setup();
        let reader = input(&[
            json!({"type": "get_conf", "tabUrl": "http://a.com/"}),
            json!({"type": "get_conf", "tabUrl": "http://b.com/"}),
        ]);
        let mut out = Vec::new();
        serve(&router, &platform, reader, &mut out).await.unwrap();

        assert_eq!(replies(out).len(), 2);
        let closed: Vec<TabId> = platform
            .actions()
            .into_iter()
            .filter(|(_, a)| *a == TabAction::Closed)
            .map(|(t, _)| t)
            .collect();
        assert_eq!(closed.len(), 2);
        assert!(closed.iter().all(|t| platform.tab(*t).is_none()));
    }

    #[tokio::test]
    async fn frame_that_is_not_json_answers_null_and_continues() {
        let (router, platform) = setup();
        let junk = b"{not json";
        let mut bytes = (junk.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(junk);
        bytes.extend(encode(&json!({"type": "get_conf"})).unwrap());

        let mut out = Vec::new();
        let served = serve(&router, &platform, Cursor::new(bytes), &mut out)
            .await
            .unwrap();
        assert_eq!(served, 2);

        let replies = replies(out);
        assert_eq!(replies[0], Value::Null);
        assert_eq!(replies[1]["config"]["max_res"], json!(5));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_login_does_not_block_later_requests() {
        let (router, platform, remote) = setup_with_remote();
        remote.fail(endpoints::START);
        let reader = input(&[json!({"type": "log_in"}), json!({"type": "get_conf"})]);

        let mut out = Vec::new();
        let served = serve(&router, &platform, reader, &mut out).await.unwrap();
        assert_eq!(served, 2);

        let replies = replies(out);
        assert_eq!(replies[0], Value::Null);
        assert_eq!(replies[1]["config"]["max_res"], json!(5));
        assert_eq!(platform.popups().len(), 1);
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let (router, platform) = setup();
        let mut bytes = encode(&json!({"type": "get_conf"})).unwrap();
        bytes.truncate(bytes.len() - 2);
        let mut out = Vec::new();
        let result = serve(&router, &platform, Cursor::new(bytes), &mut out).await;
        assert!(result.is_err());
        assert!(out.is_empty());
    }
}
