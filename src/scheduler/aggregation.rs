use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::ShutdownSignal;
use crate::aggregation::AggregationEngine;
use crate::delivery::BatchPublisher;
use crate::insights::InsightBatch;
use crate::storage::InsightStore;

/// Outcome counters for one aggregation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sessions with buffered insights.
    pub sessions: usize,
    pub batches_published: usize,
    pub alerts_persisted: usize,
    pub recommendations_persisted: usize,
    pub delivery_failures: usize,
    pub persistence_failures: usize,
}

/// Periodically aggregates every active session, publishes the batch and
/// persists alerts and recommendations.
#[derive(Clone)]
pub struct AggregationScheduler {
    engine: Arc<AggregationEngine>,
    publisher: Arc<dyn BatchPublisher>,
    store: Arc<dyn InsightStore>,
    interval: Duration,
}

impl AggregationScheduler {
    pub fn new(
        engine: Arc<AggregationEngine>,
        publisher: Arc<dyn BatchPublisher>,
        store: Arc<dyn InsightStore>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            publisher,
            store,
            interval,
        }
    }

    pub fn spawn(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    }

    /// Sleep, tick, repeat until shutdown. A tick in progress always
    /// completes.
    pub async fn run(&self, mut shutdown: ShutdownSignal) {
        info!(interval_ms = self.interval.as_millis(), "Aggregation scheduler started");

        while !shutdown.is_triggered() {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let report = self.tick().await;
            debug!(
                sessions = report.sessions,
                published = report.batches_published,
                alerts = report.alerts_persisted,
                recommendations = report.recommendations_persisted,
                delivery_failures = report.delivery_failures,
                persistence_failures = report.persistence_failures,
                "Aggregation tick complete"
            );
        }

        info!("Aggregation scheduler stopped");
    }

    /// Aggregate every session with buffered insights once.
    ///
    /// Failures are counted per session and never stop the remaining
    /// sessions from being processed.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        for session_id in self.engine.active_sessions().await {
            if self.engine.buffer_size(&session_id).await == 0 {
                continue;
            }
            report.sessions += 1;

            let batch = self.engine.aggregate(&session_id).await;
            if batch.insights.is_empty() {
                debug!(session_id = %session_id, "Nothing above threshold, skipping publish");
                continue;
            }

            self.deliver(&session_id, &batch, &mut report).await;
            self.persist(&session_id, &batch, &mut report).await;
        }

        report
    }

    async fn deliver(&self, session_id: &str, batch: &InsightBatch, report: &mut TickReport) {
        match self.publisher.publish_batch(session_id, batch).await {
            Ok(()) => report.batches_published += 1,
            Err(e) => {
                report.delivery_failures += 1;
                error!(session_id = %session_id, error = %e, "Failed to publish batch");
            }
        }
    }

    async fn persist(&self, session_id: &str, batch: &InsightBatch, report: &mut TickReport) {
        for insight in batch.alerts() {
            match self.store.persist_insight(insight).await {
                Ok(()) => report.alerts_persisted += 1,
                Err(e) => {
                    report.persistence_failures += 1;
                    error!(session_id = %session_id, insight_id = %insight.id, error = %e, "Failed to persist insight");
                }
            }
        }

        for recommendation in &batch.recommendations {
            match self
                .store
                .persist_recommendation(session_id, recommendation)
                .await
            {
                Ok(()) => report.recommendations_persisted += 1,
                Err(e) => {
                    report.persistence_failures += 1;
                    error!(session_id = %session_id, error = %e, "Failed to persist recommendation");
                }
            }
        }
    }
}
