//! Outbound HTTP for the background page.
//!
//! Every request the background makes is one [`ApiCall`] variant. A
//! [`RemoteApi`] executes calls against a server host; [`HttpRemote`] does so
//! over reqwest and [`InMemoryRemote`] answers from canned responses.

pub mod api;
pub mod call;
pub mod error;
pub mod http;
pub mod memory;

pub use api::RemoteApi;
pub use call::{ApiCall, Method};
pub use error::{RemoteError, RemoteResult};
pub use http::HttpRemote;
pub use memory::InMemoryRemote;
