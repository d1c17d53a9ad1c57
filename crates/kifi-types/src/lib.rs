//! Foundation types for the Kifi browser-extension background page.
//!
//! Every other `kifi-*` crate depends on these value types. None of them
//! carry behaviour beyond parsing and small predicates; the stateful parts
//! live in `kifi-config`, `kifi-telemetry`, and `kifi-background`.
//!
//! # Key Types
//!
//! - [`Env`]: production/development switch that selects the API host
//! - [`Session`]: in-memory identity returned by the login handshake
//! - [`User`]: identity fields persisted into config
//! - [`BookmarkNode`] / [`BookmarkFolderInfo`]: host bookmark tree records
//! - [`Tab`] / [`TabUpdate`]: host tab lifecycle records
//! - [`DeepLink`]: pane locator delivered to a tab after navigation

pub mod bookmark;
pub mod deep_link;
pub mod env;
pub mod error;
pub mod session;
pub mod tab;

pub use bookmark::{folders, BookmarkFolderInfo, BookmarkId, BookmarkNode, NewBookmark};
pub use deep_link::DeepLink;
pub use env::Env;
pub use error::TypeError;
pub use session::{Session, User};
pub use tab::{Tab, TabId, TabMessage, TabStatus, TabUpdate, WindowId, WindowKind};
