use std::sync::Mutex;

use serde_json::Value;
use tracing::{trace, warn};

use crate::event::{Event, EventFamily};

/// Append-only buffer of events awaiting the next flush.
///
/// Insertion order is time order. Draining hands over the whole buffer and
/// leaves it empty.
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Record an event stamped with the current time.
    ///
    /// `family` must name one of the [`EventFamily`] values; anything else is
    /// logged and dropped. Never fails.
    pub fn log_event(
        &self,
        family: &str,
        name: &str,
        meta_data: Option<Value>,
        prev_events: Option<Vec<Value>>,
    ) {
        let family: EventFamily = match family.parse() {
            Ok(f) => f,
            Err(_) => {
                warn!(family, name, "invalid event family");
                return;
            }
        };
        let now = chrono::Utc::now().timestamp_millis();
        self.push(
            Event::new(now, family, name)
                .with_meta(meta_data)
                .with_prev(prev_events),
        );
    }

    /// Typed shorthand for events raised by the background itself.
    pub fn record(&self, family: EventFamily, name: &str) {
        self.log_event(family.as_str(), name, None, None);
    }

    pub fn push(&self, event: Event) {
        trace!(family = %event.event_family, name = %event.event_name, "event logged");
        self.events.lock().expect("lock poisoned").push(event);
    }

    /// Take every buffered event, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().expect("lock poisoned"))
    }

    /// Copy of the buffered events.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().expect("lock poisoned").is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("pending", &self.len())
            .finish()
    }
}
