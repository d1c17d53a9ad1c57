//! Host browser surface used by the background page.
//!
//! [`PlatformAdapter`] is the single interface the rest of the background
//! depends on for bookmarks, tabs, page actions, popups, and content-script
//! messaging. Two hosts are provided:
//!
//! - [`InMemoryPlatform`]: a Chrome-shaped host held entirely in memory,
//!   used by tests and the CLI.
//! - [`safari::SafariPlatform`]: the Safari adapter, which tracks pages by
//!   locally assigned ids and queues messages until a page announces which
//!   kinds it handles.

pub mod error;
pub mod memory;
pub mod safari;
pub mod traits;

pub use error::{PlatformError, PlatformResult};
pub use memory::{InMemoryPlatform, TabAction};
pub use traits::{PlatformAdapter, PopupWindow};
