use tracing::{debug, info};

use kifi_config::keys;
use kifi_platform::PlatformAdapter;
use kifi_types::{folders, BookmarkFolderInfo, BookmarkId, BookmarkNode, NewBookmark};

use crate::context::Background;
use crate::error::{BackgroundError, BackgroundResult};

/// Find or create the `KeepIt/{public,private}` folders.
///
/// A `root` that still exists is used whatever its current title or place in
/// the tree. Otherwise a folder titled "KeepIt" is looked up in the
/// Bookmarks Bar (or the first top-level folder) and created if missing.
/// Nothing is cached between calls.
pub async fn resolve_folders(
    platform: &dyn PlatformAdapter,
    root: Option<&BookmarkId>,
) -> BackgroundResult<BookmarkFolderInfo> {
    let existing = match root {
        Some(id) => match platform.bookmark_get(id).await {
            Ok(found) => found.into_iter().next(),
            Err(e) => {
                debug!(%id, error = %e, "stored keep folder lookup failed");
                None
            }
        },
        None => None,
    };
    let keep_it = match existing {
        Some(node) => node,
        None => find_or_create_keep_it(platform).await?,
    };

    let children = platform.bookmark_children(&keep_it.id).await?;
    let public_id = ensure_child(platform, &keep_it.id, &children, folders::PUBLIC).await?;
    let private_id = ensure_child(platform, &keep_it.id, &children, folders::PRIVATE).await?;

    Ok(BookmarkFolderInfo {
        keep_it_id: keep_it.id,
        public_id,
        private_id,
    })
}

async fn find_or_create_keep_it(platform: &dyn PlatformAdapter) -> BackgroundResult<BookmarkNode> {
    let top = platform.bookmark_children(&BookmarkId::root()).await?;
    let parent = top
        .iter()
        .find(|n| n.title == folders::BOOKMARKS_BAR)
        .or_else(|| top.first())
        .ok_or(BackgroundError::NoBookmarkRoot)?;

    let siblings = platform.bookmark_children(&parent.id).await?;
    if let Some(found) = siblings.into_iter().find(|n| n.title == folders::KEEP_IT) {
        return Ok(found);
    }
    info!(parent = %parent.id, "creating KeepIt folder");
    Ok(platform
        .bookmark_create(NewBookmark::folder(parent.id.clone(), folders::KEEP_IT))
        .await?)
}

async fn ensure_child(
    platform: &dyn PlatformAdapter,
    parent: &BookmarkId,
    children: &[BookmarkNode],
    title: &str,
) -> BackgroundResult<BookmarkId> {
    if let Some(found) = children.iter().find(|n| n.title == title) {
        return Ok(found.id.clone());
    }
    debug!(%parent, title, "creating keep folder");
    let created = platform
        .bookmark_create(NewBookmark::folder(parent.clone(), title))
        .await?;
    Ok(created.id)
}

impl Background {
    /// Resolve the keep folders starting from the stored `bookmark_id`.
    pub async fn resolve_folders(&self) -> BackgroundResult<BookmarkFolderInfo> {
        let root = self.config().get().bookmark_id.map(BookmarkId::new);
        resolve_folders(self.platform().as_ref(), root.as_ref()).await
    }

    /// Resolve the keep folders and remember the root for next time.
    pub async fn resolve_and_store_folders(&self) -> BackgroundResult<BookmarkFolderInfo> {
        let info = self.resolve_folders().await?;
        self.config()
            .set(keys::BOOKMARK_ID, info.keep_it_id.as_str())?;
        Ok(info)
    }
}
