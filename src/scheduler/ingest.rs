use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::feeds::{parse_feed_message, FeedMessage, InsightFeed};
use super::ShutdownSignal;
use crate::aggregation::AggregationEngine;
use crate::config::IngestConfig;

/// Pause after a feed error before polling again.
const FEED_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Counters for one feed consumer, returned when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub received: usize,
    pub ingested: usize,
    pub dropped: usize,
}

/// Consumes external feeds into the engine's round buffer, one task per
/// feed.
#[derive(Clone)]
pub struct IngestScheduler {
    engine: Arc<AggregationEngine>,
    batch_size: usize,
    poll_timeout: Duration,
}

impl IngestScheduler {
    pub fn new(engine: Arc<AggregationEngine>, config: &IngestConfig) -> Self {
        Self {
            engine,
            batch_size: config.batch_size,
            poll_timeout: config.poll_timeout(),
        }
    }

    /// Start one consumer task per feed.
    pub fn spawn_all(
        &self,
        feeds: Vec<Box<dyn InsightFeed>>,
        shutdown: ShutdownSignal,
    ) -> Vec<JoinHandle<FeedStats>> {
        feeds
            .into_iter()
            .map(|feed| self.spawn(feed, shutdown.clone()))
            .collect()
    }

    pub fn spawn(
        &self,
        feed: Box<dyn InsightFeed>,
        shutdown: ShutdownSignal,
    ) -> JoinHandle<FeedStats> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_feed(feed, shutdown).await })
    }

    /// Consume one feed until it is exhausted or shutdown fires.
    pub async fn run_feed(
        &self,
        mut feed: Box<dyn InsightFeed>,
        mut shutdown: ShutdownSignal,
    ) -> FeedStats {
        let mut stats = FeedStats::default();
        info!(feed = feed.name(), "Feed consumer started");

        while !shutdown.is_triggered() {
            let polled = tokio::select! {
                _ = shutdown.wait() => break,
                polled = feed.poll(self.batch_size, self.poll_timeout) => polled,
            };

            match polled {
                Ok(Some(messages)) => {
                    for message in messages {
                        self.handle_message(feed.as_mut(), message, &mut stats).await;
                    }
                }
                Ok(None) => {
                    info!(feed = feed.name(), "Feed exhausted");
                    break;
                }
                Err(e) => {
                    error!(feed = feed.name(), error = %e, "Feed poll failed");
                    tokio::select! {
                        _ = shutdown.wait() => break,
                        _ = tokio::time::sleep(FEED_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!(
            feed = feed.name(),
            received = stats.received,
            ingested = stats.ingested,
            dropped = stats.dropped,
            "Feed consumer stopped"
        );
        stats
    }

    async fn handle_message(
        &self,
        feed: &mut dyn InsightFeed,
        message: FeedMessage,
        stats: &mut FeedStats,
    ) {
        stats.received += 1;

        match parse_feed_message(&message.payload) {
            Ok(insight) => {
                let session_id = insight.session_id.clone();
                self.engine.add_insight(insight).await;
                stats.ingested += 1;
                debug!(feed = feed.name(), session_id = %session_id, id = %message.id, "Insight ingested");
            }
            Err(e) => {
                // No engine-level retry: replay is the feed's business.
                stats.dropped += 1;
                warn!(feed = feed.name(), id = %message.id, reason = %e, "Dropped feed message");
            }
        }

        if let Err(e) = feed.ack(&message.id).await {
            warn!(feed = feed.name(), id = %message.id, error = %e, "Acknowledgement failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scheduler::{shutdown_channel, ChannelFeed, JsonLinesFeed};
    use tokio::io::AsyncWriteExt;

    fn scheduler() -> (Arc<AggregationEngine>, IngestScheduler) {
        let config = Config::default();
        let engine = Arc::new(AggregationEngine::new(&config));
        let mut ingest = config.ingest.clone();
        ingest.poll_timeout_ms = 20;
        (engine.clone(), IngestScheduler::new(engine, &ingest))
    }

    #[tokio::test]
    async fn test_ingests_until_exhausted() {
        let (engine, scheduler) = scheduler();
        let (_trigger, shutdown) = shutdown_channel();
        let input: &'static [u8] = b"{\"session_id\":\"r1\",\"source\":\"fraud-detection\",\"type\":\"face_switch\"}\nnot json\n{\"type\":\"x\"}\n{\"round_id\":\"r2\"}\n";

        let stats = scheduler
            .run_feed(Box::new(JsonLinesFeed::new("lines", input)), shutdown)
            .await;

        assert_eq!(
            stats,
            FeedStats {
                received: 4,
                ingested: 2,
                dropped: 2
            }
        );
        assert_eq!(engine.buffer_size("r1").await, 1);
        assert_eq!(engine.buffer_size("r2").await, 1);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_consumer() {
        let (_engine, scheduler) = scheduler();
        let (_trigger, shutdown) = shutdown_channel();
        let (tx, feed) = ChannelFeed::new("chan", 8);
        tx.send(r#"{"session_id":"r1"}"#.to_string()).await.unwrap();
        tx.send("garbage".to_string()).await.unwrap();
        drop(tx);

        let stats = scheduler.run_feed(Box::new(feed), shutdown).await;

        assert_eq!(stats.received, 2);
        assert_eq!(stats.ingested, 1);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let (_engine, scheduler) = scheduler();
        let (trigger, shutdown) = shutdown_channel();
        let (_tx, feed) = ChannelFeed::new("idle", 8);

        let handle = scheduler.spawn(Box::new(feed), shutdown);
        trigger.trigger();

        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats, FeedStats::default());
    }

    #[tokio::test]
    async fn test_shutdown_keeps_lines_already_read() {
        let config = Config::default();
        let engine = Arc::new(AggregationEngine::new(&config));
        let scheduler = IngestScheduler::new(engine.clone(), &config.ingest);
        let (trigger, shutdown) = shutdown_channel();

        let (mut writer, reader) = tokio::io::duplex(1024);
        let feed = JsonLinesFeed::new("pipe", tokio::io::BufReader::new(reader));
        let handle = scheduler.spawn(Box::new(feed), shutdown);

        writer
            .write_all(b"{\"session_id\":\"r1\",\"source\":\"fraud-detection\",\"type\":\"face_switch\"}\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.trigger();

        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.ingested, 1);
        assert_eq!(engine.buffer_size("r1").await, 1);
        drop(writer);
    }
}
