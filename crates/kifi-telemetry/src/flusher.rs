use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::batch::EventBatch;
use crate::log::EventLog;
use crate::schedule::{FlushOutcome, FlushSchedule};
use crate::sink::EventSink;

/// Drains an [`EventLog`] into an [`EventSink`] on a [`FlushSchedule`].
pub struct EventFlusher {
    log: Arc<EventLog>,
    sink: Arc<dyn EventSink>,
    schedule: FlushSchedule,
}

impl EventFlusher {
    pub fn new(log: Arc<EventLog>, sink: Arc<dyn EventSink>, schedule: FlushSchedule) -> Self {
        Self {
            log,
            sink,
            schedule,
        }
    }

    pub fn schedule(&self) -> &FlushSchedule {
        &self.schedule
    }

    /// Run one flush. The drained batch is sent on its own task, so the
    /// buffer is empty and the schedule advanced without waiting for
    /// delivery. Must be called inside a tokio runtime.
    pub fn tick(&mut self) -> FlushOutcome {
        let now = chrono::Utc::now().timestamp_millis();
        let outcome = match EventBatch::new(self.log.drain(), now, self.sink.install_id()) {
            None => FlushOutcome::Idle,
            Some(batch) => {
                let events = batch.len();
                debug!(events, "sending event batch");
                let sink = Arc::clone(&self.sink);
                tokio::spawn(async move {
                    if let Err(e) = sink.send(&batch).await {
                        error!(events, error = %e, "event batch dropped");
                    }
                });
                FlushOutcome::Sent { events }
            }
        };
        self.schedule.advance(outcome);
        outcome
    }

    /// Tick forever, sleeping the scheduled delay between ticks, until
    /// `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(delay_ms = self.schedule.delay_ms(), "event flusher started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.schedule.delay()) => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("event flusher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelemetryResult;
    use crate::event::{Event, EventFamily};
    use crate::sink::RecordingSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn flusher(sink: Arc<dyn EventSink>) -> (Arc<EventLog>, EventFlusher) {
        let log = Arc::new(EventLog::new());
        let f = EventFlusher::new(
            log.clone(),
            sink,
            FlushSchedule::new(Duration::from_millis(4_000)),
        );
        (log, f)
    }

    async fn batches_reach(sink: &RecordingSink, n: usize) {
        for _ in 0..100 {
            if sink.batches().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} batches, got {}", sink.batches().len());
    }

    /// Sink whose sends never complete.
    #[derive(Default)]
    struct StalledSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for StalledSink {
        fn install_id(&self) -> Option<String> {
            None
        }

        async fn send(&self, _batch: &EventBatch) -> TelemetryResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn sends_and_clears() {
        let sink = Arc::new(RecordingSink::new(Some("inst".into())));
        let (log, mut f) = flusher(sink.clone());
        log.push(Event::new(100, EventFamily::Search, "newSearch"));
        log.push(Event::new(130, EventFamily::Search, "newSearch"));

        assert_eq!(f.tick(), FlushOutcome::Sent { events: 2 });
        assert!(log.is_empty());
        assert_eq!(f.schedule().delay_ms(), 5_000);

        batches_reach(&sink, 1).await;
        let batches = sink.batches();
        assert_eq!(batches[0].install_id.as_deref(), Some("inst"));
        assert_eq!(batches[0].events[1].time, 30);
    }

    #[tokio::test]
    async fn failed_send_still_clears_then_backs_off() {
        let sink = Arc::new(RecordingSink::failing());
        let (log, mut f) = flusher(sink.clone());
        log.record(EventFamily::Extension, "started");

        assert_eq!(f.tick(), FlushOutcome::Sent { events: 1 });
        assert!(log.is_empty());
        assert_eq!(f.schedule().delay_ms(), 5_000);
        batches_reach(&sink, 1).await;

        assert_eq!(f.tick(), FlushOutcome::Idle);
        assert_eq!(f.schedule().delay_ms(), 10_000);
        assert_eq!(sink.batches().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_flushes_on_timer_and_stops() {
        let sink = Arc::new(RecordingSink::new(None));
        let (log, f) = flusher(sink.clone());
        let (tx, rx) = watch::channel(false);
        log.record(EventFamily::Extension, "started");

        let handle = tokio::spawn(f.run(rx));
        tokio::time::sleep(Duration::from_millis(3_900)).await;
        assert!(sink.batches().is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        batches_reach(&sink, 1).await;

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_send_does_not_stop_the_loop() {
        let sink = Arc::new(StalledSink::default());
        let (log, f) = flusher(sink.clone());
        let (tx, rx) = watch::channel(false);
        log.record(EventFamily::Extension, "started");

        let handle = tokio::spawn(f.run(rx));
        tokio::time::sleep(Duration::from_millis(4_100)).await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
        assert!(log.is_empty());

        for _ in 0..50 {
            log.record(EventFamily::Slider, "opened");
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(log.is_empty());
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
