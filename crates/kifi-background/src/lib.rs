//! Background coordinator for the Kifi extension.
//!
//! [`Background`] holds the shared state: config, session, event log, and the
//! host and server handles. Behavior is split by concern:
//!
//! - `session`: authentication handshake, login popup, logout.
//! - `keeps`: keeping, unkeeping, privacy, bookmark upload.
//! - `page`: page-load flow and page-action icon.
//! - `social`: search, slider, comments, friends.
//! - `deep_link`: one-shot listeners that forward a locator to a tab.
//! - `inject`: script and stylesheet injection with dependency closure.
//! - `lifecycle`: startup, version checks, background tasks.
//!
//! [`MessageRouter`] is the single entry point for page messages.

pub mod context;
pub mod deep_link;
pub mod error;
pub mod inject;
pub mod keeps;
pub mod lifecycle;
pub mod page;
pub mod resolver;
pub mod router;
pub mod session;
pub mod sink;
pub mod social;

pub use context::Background;
pub use deep_link::{has_forwarded, DeepLinkOutcome};
pub use error::{BackgroundError, BackgroundResult};
pub use keeps::sources;
pub use lifecycle::{StartReason, TaskHandle};
pub use page::{PageLoadOutcome, UserHistory};
pub use resolver::resolve_folders;
pub use router::{MessageRouter, MessageSender, Reply};
pub use sink::RemoteEventSink;
