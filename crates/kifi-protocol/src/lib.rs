//! Wire vocabulary between extension pages and the background.
//!
//! - [`ExtensionMessage`] is the closed set of inbound request types.
//! - [`MessageCodec`] turns raw JSON into a message, keeping unknown or
//!   malformed payloads distinguishable so the router can log and ignore them.
//! - [`frame`] implements native-messaging framing (little-endian `u32`
//!   length followed by UTF-8 JSON).
//! - [`endpoints`] lists the server paths the background talks to.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoded, MessageCodec};
pub use endpoint::{endpoints, server_url};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{tab_kinds, ExtensionMessage, PostComment};
