//! Persistence of alerted insights and recommendations.
//!
//! Writes are fire-and-forget from the aggregation loop's point of view: the
//! scheduler logs failures and moves on. Reads exist for the request surface
//! and for tests.

mod sqlite;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::insights::{
    AggregatedInsight, Category, Recommendation, RecommendationKind, Severity,
};

/// Status given to every newly stored recommendation.
pub const STATUS_PENDING: &str = "pending";

/// Text fields of an insight, stored together as one JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightContent {
    pub title: String,
    pub description: String,
    pub evidence: Vec<String>,
    pub followup_questions: Vec<String>,
}

/// A persisted alerted insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInsight {
    /// Row identifier (UUID v4).
    pub id: String,
    pub session_id: String,
    /// Engine-assigned `{session}-{n}` id of the aggregated insight.
    pub insight_id: String,
    pub insight_type: String,
    pub category: Category,
    pub severity: Severity,
    pub confidence: f64,
    pub content: InsightContent,
    pub source_services: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredInsight {
    /// Row for an aggregated insight, stamped with the insight's timestamp.
    pub fn from_insight(insight: &AggregatedInsight) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: insight.session_id.clone(),
            insight_id: insight.id.clone(),
            insight_type: insight.insight_type.clone(),
            category: insight.category,
            severity: insight.severity,
            confidence: insight.confidence,
            content: InsightContent {
                title: insight.title.clone(),
                description: insight.description.clone(),
                evidence: insight.evidence.clone(),
                followup_questions: insight.followup_questions.clone(),
            },
            source_services: insight.source_services.clone(),
            created_at: insight.timestamp,
        }
    }
}

/// A persisted recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecommendation {
    pub id: String,
    pub session_id: String,
    pub kind: RecommendationKind,
    pub priority: Severity,
    pub recommendation: Recommendation,
    /// Review status; `pending` on insert.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl StoredRecommendation {
    pub fn new(session_id: impl Into<String>, recommendation: &Recommendation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            kind: recommendation.kind,
            priority: recommendation.priority,
            recommendation: recommendation.clone(),
            status: STATUS_PENDING.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Storage backend for aggregation output.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Persist one alerted insight.
    async fn persist_insight(&self, insight: &AggregatedInsight) -> StorageResult<()>;
    /// Persist one recommendation for a session.
    async fn persist_recommendation(
        &self,
        session_id: &str,
        recommendation: &Recommendation,
    ) -> StorageResult<()>;
    /// Stored insights for a session, oldest first.
    async fn session_insights(&self, session_id: &str) -> StorageResult<Vec<StoredInsight>>;
    /// Stored recommendations for a session, oldest first.
    async fn session_recommendations(
        &self,
        session_id: &str,
    ) -> StorageResult<Vec<StoredRecommendation>>;
    /// Cheap connectivity check.
    async fn ping(&self) -> StorageResult<()>;
}
