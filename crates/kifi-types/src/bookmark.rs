use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known folder titles and ids in the host bookmark tree.
pub mod folders {
    /// Id of the invisible root whose children are the top-level folders.
    pub const ROOT_ID: &str = "0";
    pub const BOOKMARKS_BAR: &str = "Bookmarks Bar";
    pub const KEEP_IT: &str = "KeepIt";
    pub const PUBLIC: &str = "public";
    pub const PRIVATE: &str = "private";
}

/// Opaque host-assigned bookmark identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub String);

impl BookmarkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(folders::ROOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookmarkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A bookmark or folder in the host tree. Folders have no `url`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    pub id: BookmarkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BookmarkId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BookmarkNode {
    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }
}

/// Creation request for a bookmark or (when `url` is `None`) a folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub parent_id: BookmarkId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NewBookmark {
    pub fn folder(parent_id: BookmarkId, title: impl Into<String>) -> Self {
        Self {
            parent_id,
            title: title.into(),
            url: None,
        }
    }

    pub fn page(parent_id: BookmarkId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            parent_id,
            title: title.into(),
            url: Some(url.into()),
        }
    }
}

/// The three folders keeps are filed under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkFolderInfo {
    pub keep_it_id: BookmarkId,
    pub public_id: BookmarkId,
    pub private_id: BookmarkId,
}

impl BookmarkFolderInfo {
    /// Folder a keep with the given privacy belongs in.
    pub fn folder_for(&self, private: bool) -> &BookmarkId {
        if private {
            &self.private_id
        } else {
            &self.public_id
        }
    }

    /// Whether `parent` is one of the two keep folders.
    pub fn holds(&self, parent: &BookmarkId) -> bool {
        *parent == self.public_id || *parent == self.private_id
    }
}
