use std::time::Duration;

/// Floor for the delay after a batch was sent.
pub const ACTIVE_FLOOR_MS: u64 = 5_000;
/// Ceiling for the delay while idle.
pub const IDLE_CEILING_MS: u64 = 60_000;

/// Result of one flush tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Buffer was empty.
    Idle,
    /// A batch was handed to the sink. Delivery is not awaited.
    Sent { events: usize },
}

/// State machine driving the flush timer.
///
/// After a batch goes out the next delay is `max(sqrt(delay), 5s)` so the
/// loop re-checks soon after activity. While idle the delay doubles up to
/// 60s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlushSchedule {
    delay_ms: u64,
    last_outcome: Option<FlushOutcome>,
}

impl FlushSchedule {
    pub fn new(initial: Duration) -> Self {
        Self {
            delay_ms: initial.as_millis() as u64,
            last_outcome: None,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn last_outcome(&self) -> Option<FlushOutcome> {
        self.last_outcome
    }

    /// Advance after a tick and return the next delay.
    pub fn advance(&mut self, outcome: FlushOutcome) -> Duration {
        self.delay_ms = match outcome {
            FlushOutcome::Idle => self.delay_ms.saturating_mul(2).min(IDLE_CEILING_MS),
            FlushOutcome::Sent { .. } => {
                ((self.delay_ms as f64).sqrt().round() as u64).max(ACTIVE_FLOOR_MS)
            }
        };
        self.last_outcome = Some(outcome);
        self.delay()
    }
}
