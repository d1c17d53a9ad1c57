//! Analytics event buffering for the Kifi background page.
//!
//! Handlers record events into a process-wide [`EventLog`]. An
//! [`EventFlusher`] drains the log on a self-adjusting schedule: quickly after
//! activity, backing off exponentially while idle. Delivery is at most once;
//! a batch that fails to send is dropped.

pub mod batch;
pub mod error;
pub mod event;
pub mod flusher;
pub mod log;
pub mod schedule;
pub mod sink;

pub use batch::EventBatch;
pub use error::{TelemetryError, TelemetryResult};
pub use event::{Event, EventFamily};
pub use flusher::EventFlusher;
pub use log::EventLog;
pub use schedule::{FlushOutcome, FlushSchedule};
pub use sink::{EventSink, RecordingSink};
