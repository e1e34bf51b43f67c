//! Orchestration of one aggregation pass over a session's buffer.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::alerts::AlertGate;
use super::buffer::RoundBuffer;
use super::grouping::group_insights;
use super::recommendations::{AssessmentBuilder, RecommendationGenerator};
use super::scoring::Scorer;
use super::summary::SummaryBuilder;
use crate::config::{AggregationConfig, Config};
use crate::insights::{AggregatedInsight, Assessment, InsightBatch, RawInsight};

/// Buffers raw insights per session and turns them into insight batches.
///
/// All state is owned here and injected with configuration at construction;
/// the engine is shared between the ingest path, the periodic scheduler and
/// the request server behind an `Arc`.
#[derive(Debug)]
pub struct AggregationEngine {
    config: AggregationConfig,
    buffer: RoundBuffer,
    scorer: Scorer,
    alert_gate: AlertGate,
    recommendations: RecommendationGenerator,
    sequences: Mutex<HashMap<String, u64>>,
}

impl AggregationEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: RoundBuffer::new(config.aggregation.retention()),
            scorer: Scorer::new(),
            alert_gate: AlertGate::new(config.alerts.clone()),
            recommendations: RecommendationGenerator::new(
                config.aggregation.max_recommendations_per_round,
            ),
            sequences: Mutex::new(HashMap::new()),
            config: config.aggregation.clone(),
        }
    }

    /// Buffer a raw insight. Returns the session's buffer size.
    pub async fn add_insight(&self, insight: RawInsight) -> usize {
        let session_id = insight.session_id.clone();
        let size = self.buffer.add(insight).await;
        debug!(session_id = %session_id, buffer_size = size, "Insight buffered");
        size
    }

    /// Direct access to the round buffer.
    pub fn buffer(&self) -> &RoundBuffer {
        &self.buffer
    }

    /// Aggregate the session's buffered insights. Does not clear the buffer.
    pub async fn aggregate(&self, session_id: &str) -> InsightBatch {
        let snapshot = self.buffer.snapshot(session_id).await;
        if snapshot.is_empty() {
            return InsightBatch::empty(session_id);
        }

        let now = Utc::now();
        let groups = group_insights(&snapshot);

        let mut insights = Vec::with_capacity(groups.len());
        for group in &groups {
            let id = self.next_id(session_id).await;
            if let Some(insight) = self.scorer.score(id, session_id, group, now) {
                insights.push(insight);
            }
        }

        insights.retain(|i| i.confidence >= self.config.min_confidence_threshold);
        insights.sort_by(priority_order);
        insights.truncate(self.config.max_insights_per_batch);

        for insight in insights.iter_mut() {
            insight.is_alert = self.alert_gate.should_alert_at(insight, now).await;
        }

        let recommendations = if self.config.generate_recommendations {
            self.recommendations.generate(&insights)
        } else {
            Vec::new()
        };

        let summary = SummaryBuilder::build(&insights);

        info!(
            session_id = %session_id,
            raw = snapshot.len(),
            insights = summary.total_insights,
            alerts = summary.alerts_count,
            recommendations = recommendations.len(),
            "Aggregated insights"
        );

        InsightBatch {
            session_id: session_id.to_string(),
            insights,
            recommendations,
            summary,
            timestamp: now,
        }
    }

    /// Drop everything held for a session: buffer, alert cooldowns and the
    /// id counter. Returns the number of buffered records removed.
    pub async fn clear(&self, session_id: &str) -> usize {
        let removed = self.buffer.clear(session_id).await;
        let purged = self.alert_gate.purge_session(session_id).await;
        self.sequences.lock().await.remove(session_id);
        info!(session_id = %session_id, removed, alert_keys = purged, "Session cleared");
        removed
    }

    pub async fn buffer_size(&self, session_id: &str) -> usize {
        self.buffer.size(session_id).await
    }

    pub async fn active_sessions(&self) -> Vec<String> {
        self.buffer.active_sessions().await
    }

    /// Overall risk assessment from a fresh aggregation of the session.
    pub async fn assessment(&self, session_id: &str, duration_minutes: u32) -> Assessment {
        let batch = self.aggregate(session_id).await;
        AssessmentBuilder::assess(session_id, &batch.insights, duration_minutes)
    }

    async fn next_id(&self, session_id: &str) -> String {
        let mut sequences = self.sequences.lock().await;
        let n = sequences.entry(session_id.to_string()).or_insert(0);
        *n += 1;
        format!("{}-{}", session_id, n)
    }
}

/// Category priority ascending, then confidence and severity descending.
fn priority_order(a: &AggregatedInsight, b: &AggregatedInsight) -> Ordering {
    a.category
        .priority()
        .cmp(&b.category.priority())
        .then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.severity.weight().cmp(&a.severity.weight()))
}
