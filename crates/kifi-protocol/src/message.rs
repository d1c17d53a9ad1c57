use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use kifi_types::DeepLink;

/// Kinds of messages the background posts to content scripts.
pub mod tab_kinds {
    pub const AUTO_SHOW_AFTER: &str = "auto_show_after";
    pub const DEEP_LINK: &str = "deep_link";
    pub const BUTTON_CLICK: &str = "button_click";
}

/// Every request a content script or extension page can send.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtensionMessage {
    PageLoad,
    GetKeeps {
        #[serde(default)]
        query: String,
        #[serde(default, rename = "lastUUID", skip_serializing_if = "Option::is_none")]
        last_uuid: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    AddBookmarks {
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        private: bool,
    },
    Unkeep {
        url: String,
    },
    SetPrivate {
        url: String,
        #[serde(default)]
        private: bool,
    },
    Follow {
        #[serde(default)]
        follow: bool,
    },
    GetConf,
    SetConf {
        key: String,
        #[serde(default)]
        value: Value,
    },
    RemoveConf {
        key: String,
    },
    UploadAllBookmarks,
    SetPageIcon {
        #[serde(default)]
        is_kept: bool,
    },
    GetSliderInfo,
    GetSliderUpdates,
    LogEvent {
        #[serde(default)]
        args: Vec<Value>,
    },
    GetComments {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default, rename = "commentId", skip_serializing_if = "Option::is_none")]
        comment_id: Option<String>,
    },
    PostComment(PostComment),
    GetFriends,
    LogIn,
    LogOut,
    Require {
        #[serde(default)]
        scripts: Vec<String>,
        #[serde(default)]
        injected: Map<String, Value>,
    },
    AddDeepLinkListener {
        link: DeepLink,
    },
}

/// Body of a `post_comment` request, forwarded to the server unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PostComment {
    #[serde(default)]
    pub url: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub text: Value,
    #[serde(default)]
    pub permissions: Value,
    #[serde(default)]
    pub parent: Value,
    #[serde(default)]
    pub recipients: Value,
}

impl ExtensionMessage {
    /// Every wire `type` string, in declaration order.
    pub const TYPES: [&'static str; 21] = [
        "page_load",
        "get_keeps",
        "add_bookmarks",
        "unkeep",
        "set_private",
        "follow",
        "get_conf",
        "set_conf",
        "remove_conf",
        "upload_all_bookmarks",
        "set_page_icon",
        "get_slider_info",
        "get_slider_updates",
        "log_event",
        "get_comments",
        "post_comment",
        "get_friends",
        "log_in",
        "log_out",
        "require",
        "add_deep_link_listener",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PageLoad => "page_load",
            Self::GetKeeps { .. } => "get_keeps",
            Self::AddBookmarks { .. } => "add_bookmarks",
            Self::Unkeep { .. } => "unkeep",
            Self::SetPrivate { .. } => "set_private",
            Self::Follow { .. } => "follow",
            Self::GetConf => "get_conf",
            Self::SetConf { .. } => "set_conf",
            Self::RemoveConf { .. } => "remove_conf",
            Self::UploadAllBookmarks => "upload_all_bookmarks",
            Self::SetPageIcon { .. } => "set_page_icon",
            Self::GetSliderInfo => "get_slider_info",
            Self::GetSliderUpdates => "get_slider_updates",
            Self::LogEvent { .. } => "log_event",
            Self::GetComments { .. } => "get_comments",
            Self::PostComment(_) => "post_comment",
            Self::GetFriends => "get_friends",
            Self::LogIn => "log_in",
            Self::LogOut => "log_out",
            Self::Require { .. } => "require",
            Self::AddDeepLinkListener { .. } => "add_deep_link_listener",
        }
    }

    /// Whether handling this message needs the sender's tab.
    pub fn needs_tab(&self) -> bool {
        matches!(
            self,
            Self::PageLoad
                | Self::Follow { .. }
                | Self::SetPageIcon { .. }
                | Self::GetSliderInfo
                | Self::GetSliderUpdates
                | Self::Require { .. }
                | Self::AddDeepLinkListener { .. }
        ) || matches!(self, Self::GetComments { comment_id: None, .. })
    }
}
