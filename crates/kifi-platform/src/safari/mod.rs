//! Safari host adapter.
//!
//! Safari tabs carry no stable id across navigations, so each tab is wrapped
//! in a [`Page`](pages::Page) with a locally assigned id that is torn down and
//! recreated on every navigation. Content scripts announce the message kinds
//! they are ready for with `api:handling`; until then outbound messages may
//! be queued.

pub mod host;
pub mod pages;
pub mod platform;

pub use host::{HostCall, RecordingSafariHost, SafariHost};
pub use pages::{EmitOutcome, Page, PageRegistry, QueueMode};
pub use platform::SafariPlatform;
