use std::sync::Mutex;

use serde_json::Value;

use kifi_types::TabId;

use crate::error::PlatformResult;

/// Raw operations provided by the Safari application object.
pub trait SafariHost: Send + Sync {
    /// Post a message to the content page of a tab.
    fn dispatch_message(&self, tab: TabId, kind: &str, data: &Value) -> PlatformResult<()>;

    /// Open a tab in the active window and point it at `url`.
    fn open_tab(&self, tab: TabId, url: &str) -> PlatformResult<()>;

    fn close_tab(&self, tab: TabId) -> PlatformResult<()>;

    /// Safari has one toolbar item shared by all tabs.
    fn set_toolbar_icon(&self, image: &str, tool_tip: &str) -> PlatformResult<()>;
}

/// A call made on a [`RecordingSafariHost`].
#[derive(Clone, Debug, PartialEq)]
pub enum HostCall {
    Dispatch { tab: TabId, kind: String, data: Value },
    OpenTab { tab: TabId, url: String },
    CloseTab(TabId),
    ToolbarIcon { image: String, tool_tip: String },
}

/// [`SafariHost`] that records every call and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingSafariHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingSafariHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// `(kind, data)` of every message dispatched to `tab`.
    pub fn dispatched_to(&self, tab: TabId) -> Vec<(String, Value)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Dispatch { tab: t, kind, data } if t == tab => Some((kind, data)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: HostCall) {
        self.calls.lock().expect("lock poisoned").push(call);
    }
}

impl SafariHost for RecordingSafariHost {
    fn dispatch_message(&self, tab: TabId, kind: &str, data: &Value) -> PlatformResult<()> {
        self.push(HostCall::Dispatch {
            tab,
            kind: kind.to_string(),
            data: data.clone(),
        });
        Ok(())
    }

    fn open_tab(&self, tab: TabId, url: &str) -> PlatformResult<()> {
        self.push(HostCall::OpenTab {
            tab,
            url: url.to_string(),
        });
        Ok(())
    }

    fn close_tab(&self, tab: TabId) -> PlatformResult<()> {
        self.push(HostCall::CloseTab(tab));
        Ok(())
    }

    fn set_toolbar_icon(&self, image: &str, tool_tip: &str) -> PlatformResult<()> {
        self.push(HostCall::ToolbarIcon {
            image: image.to_string(),
            tool_tip: tool_tip.to_string(),
        });
        Ok(())
    }
}
