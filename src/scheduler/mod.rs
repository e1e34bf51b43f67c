//! Long-running loops: feed ingestion and periodic aggregation.
//!
//! Both loops stop cooperatively when the shared [`ShutdownSignal`] fires,
//! after finishing the message or tick in flight.

mod aggregation;
mod feeds;
mod ingest;

pub use aggregation::{AggregationScheduler, TickReport};
pub use feeds::{parse_feed_message, ChannelFeed, FeedMessage, InsightFeed, JsonLinesFeed};
pub use ingest::{FeedStats, IngestScheduler};

use tokio::sync::watch;

/// Create a linked shutdown trigger and signal.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), ShutdownSignal(rx))
}

/// Fires the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace never fails, even when every receiver is gone.
        self.0.send_replace(true);
    }

    /// Another signal observing this trigger.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.subscribe())
    }
}

/// Observes the shutdown trigger. Cheap to clone, one per loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once shutdown is triggered. A dropped trigger counts as
    /// triggered.
    pub async fn wait(&mut self) {
        // wait_for errs only when the sender is gone.
        let _ = self.0.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_observes_trigger() {
        let (trigger, mut signal) = shutdown_channel();
        let other = trigger.subscribe();
        assert!(!signal.is_triggered());

        trigger.trigger();

        assert!(signal.is_triggered());
        assert!(other.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_trigger_releases_waiters() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
    }
}
