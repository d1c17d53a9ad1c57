use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Envelope version understood by `/users/events`.
pub const BATCH_VERSION: u32 = 1;

/// A drained set of events ready to POST.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    pub version: u32,
    /// Milliseconds between the first event and the moment of sending.
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_id: Option<String>,
    /// Event times are relative to the first event.
    pub events: Vec<Event>,
}

impl EventBatch {
    /// Build a batch from buffered events, rewriting each event's time to be
    /// relative to the first one. Returns `None` for an empty buffer.
    pub fn new(mut events: Vec<Event>, now_ms: i64, install_id: Option<String>) -> Option<Self> {
        let t0 = events.first()?.time;
        for e in &mut events {
            e.time -= t0;
        }
        Some(Self {
            version: BATCH_VERSION,
            time: now_ms - t0,
            install_id,
            events,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventFamily;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn empty_buffer_makes_no_batch() {
        assert!(EventBatch::new(vec![], 10, None).is_none());
    }

    #[test]
    fn envelope_shape() {
        let events = vec![
            Event::new(1_000, EventFamily::Extension, "started"),
            Event::new(1_250, EventFamily::Search, "newSearch"),
        ];
        let batch = EventBatch::new(events, 1_400, Some("inst-1".into())).unwrap();
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "version": 1,
                "time": 400,
                "installId": "inst-1",
                "events": [
                    {"time": 0, "eventFamily": "extension", "eventName": "started"},
                    {"time": 250, "eventFamily": "search", "eventName": "newSearch"}
                ]
            })
        );
    }

    proptest! {
        #[test]
        fn times_are_relative_to_first(
            start in 0i64..1_000_000_000,
            gaps in proptest::collection::vec(0i64..10_000, 1..20),
        ) {
            let mut t = start;
            let events: Vec<Event> = gaps
                .iter()
                .map(|g| {
                    t += g;
                    Event::new(t, EventFamily::Slider, "x")
                })
                .collect();
            let batch = EventBatch::new(events, t + 1, None).unwrap();
            prop_assert!(batch.events.iter().all(|e| e.time >= 0));
            prop_assert_eq!(batch.events.iter().map(|e| e.time).min(), Some(0));
        }
    }
}
