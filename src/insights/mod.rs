//! Insight data model.
//!
//! Raw observations arrive from the upstream analyzers as [`RawInsight`]
//! records carrying an open [`InsightData`] payload. The aggregation engine
//! turns them into [`AggregatedInsight`]s, packaged per session in an
//! [`InsightBatch`] together with [`Recommendation`]s and a [`Summary`].

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Confidence reported by a producer that does not supply one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Insight types that are identity signals regardless of the producer.
pub const FRAUD_SIGNAL_TYPES: [&str; 3] = ["multiple_faces", "face_switch", "background_voice"];

// ============================================================================
// Category & Severity
// ============================================================================

/// Fixed insight categories, derived from the producing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Identity / integrity signals (multiple faces, face switch, voices).
    Fraud,
    /// Statements contradicting the candidate's resume.
    Contradiction,
    /// Speech delivery signals.
    Speech,
    /// Video feed signals.
    Video,
    /// Anything from an unknown producer.
    Other,
}

impl Category {
    /// Map a producer identity to its category.
    pub fn from_source(source: &str) -> Self {
        match source {
            "speech-analysis" => Category::Speech,
            "video-analysis" => Category::Video,
            "fraud-detection" => Category::Fraud,
            "nlp-engine" => Category::Contradiction,
            _ => Category::Other,
        }
    }

    /// Resolve the category of a record.
    ///
    /// An explicit category wins. Identity signals are fraud whichever
    /// analyzer raised them; everything else follows the producer.
    pub fn resolve(source: &str, insight_type: &str, explicit: Option<Category>) -> Self {
        if let Some(category) = explicit {
            return category;
        }
        if FRAUD_SIGNAL_TYPES.contains(&insight_type) {
            return Category::Fraud;
        }
        Self::from_source(source)
    }

    /// Sort priority, lower comes first.
    pub fn priority(&self) -> u32 {
        match self {
            Category::Fraud => 1,
            Category::Contradiction => 2,
            Category::Speech => 3,
            Category::Video => 4,
            Category::Other => 99,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fraud => "fraud",
            Category::Contradiction => "contradiction",
            Category::Speech => "speech",
            Category::Video => "video",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fraud" => Ok(Category::Fraud),
            "contradiction" => Ok(Category::Contradiction),
            "speech" => Ok(Category::Speech),
            "video" => Ok(Category::Video),
            "other" => Ok(Category::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Insight severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Numeric weight used for averaging and sorting.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    /// Bucket an averaged weight back into a severity.
    pub fn from_average(avg: f64) -> Self {
        if avg >= 2.5 {
            Severity::High
        } else if avg >= 1.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Lenient parse used for producer payloads: anything unknown is low.
    pub fn from_reported(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

// ============================================================================
// Raw insights
// ============================================================================

/// Producer-specific payload of a raw insight.
///
/// The map is kept as sent; typed accessors apply the defaulting rules the
/// scorer relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightData(Map<String, Value>);

impl InsightData {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw field access.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reported confidence, [`DEFAULT_CONFIDENCE`] when absent or not numeric.
    pub fn confidence(&self) -> f64 {
        self.0
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_CONFIDENCE)
    }

    /// Reported severity, low when absent or unrecognised.
    pub fn severity(&self) -> Severity {
        self.0
            .get("severity")
            .and_then(Value::as_str)
            .map(Severity::from_reported)
            .unwrap_or_default()
    }

    /// Producer description, if it is a non-empty string.
    pub fn description(&self) -> Option<&str> {
        self.0
            .get("description")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Evidence strings; non-string entries are skipped.
    pub fn evidence(&self) -> Vec<String> {
        self.string_list("evidence")
    }

    /// Suggested follow-up questions.
    pub fn followup_questions(&self) -> Vec<String> {
        self.string_list("followup_questions")
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }
}

impl From<Map<String, Value>> for InsightData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// An unprocessed observation from one analyzer about one session.
///
/// Never mutated once stored in the round buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInsight {
    /// Session (interview round) the observation belongs to.
    pub session_id: String,
    /// Producer identity, e.g. `fraud-detection`.
    pub source: String,
    /// Producer-defined insight type, e.g. `multiple_faces`.
    #[serde(rename = "type")]
    pub insight_type: String,
    /// Category override supplied by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Set by the engine on ingest.
    pub received_at: DateTime<Utc>,
    /// Producer payload.
    #[serde(default)]
    pub data: InsightData,
}

impl RawInsight {
    /// Create a raw insight stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        source: impl Into<String>,
        insight_type: impl Into<String>,
        data: InsightData,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            source: source.into(),
            insight_type: insight_type.into(),
            category: None,
            received_at: Utc::now(),
            data,
        }
    }

    /// Tag the record with an explicit category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Category this record aggregates under.
    pub fn category(&self) -> Category {
        Category::resolve(&self.source, &self.insight_type, self.category)
    }
}

// ============================================================================
// Aggregated output
// ============================================================================

/// A scored synthesis of raw insights sharing (category, type) in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedInsight {
    /// `{session_id}-{n}`, monotonically increasing per session.
    pub id: String,
    pub session_id: String,
    pub category: Category,
    pub insight_type: String,
    /// Always within [0, 1].
    pub confidence: f64,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub evidence: Vec<String>,
    pub source_services: Vec<String>,
    pub followup_questions: Vec<String>,
    /// Set by the alert gate.
    pub is_alert: bool,
    pub timestamp: DateTime<Utc>,
}

/// Kind of interviewer recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Action,
    Clarification,
    Observation,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Action => "action",
            RecommendationKind::Clarification => "clarification",
            RecommendationKind::Observation => "observation",
        }
    }
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecommendationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "action" => Ok(RecommendationKind::Action),
            "clarification" => Ok(RecommendationKind::Clarification),
            "observation" => Ok(RecommendationKind::Observation),
            _ => Err(format!("Unknown recommendation type: {}", s)),
        }
    }
}

/// An interviewer-facing suggestion derived from an alerted insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Severity,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_questions: Vec<String>,
    pub related_insight_id: String,
}

/// Per-batch rollup statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_insights: usize,
    pub alerts_count: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    /// Mean confidence over the insights in the batch, 0 when empty.
    pub overall_confidence: f64,
}

/// Result of one aggregation pass over a session's buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightBatch {
    pub session_id: String,
    /// Priority order.
    pub insights: Vec<AggregatedInsight>,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
    pub timestamp: DateTime<Utc>,
}

impl InsightBatch {
    /// A batch with nothing in it.
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            summary: Summary::default(),
            timestamp: Utc::now(),
        }
    }

    /// Insights promoted to alerts.
    pub fn alerts(&self) -> impl Iterator<Item = &AggregatedInsight> {
        self.insights.iter().filter(|i| i.is_alert)
    }
}

/// Overall interview risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Risk assessment for an interview so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub session_id: String,
    pub interview_duration_minutes: u32,
    pub risk_level: RiskLevel,
    pub risk_explanation: String,
    pub fraud_indicators: usize,
    pub contradictions_found: usize,
    pub total_insights: usize,
    pub next_steps: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
