//! Alert promotion with per-(session, category, type) cooldown.
//!
//! An aggregated insight becomes an alert when it clears its category's
//! confidence gate (or is high severity with confidence ≥ 0.8) and no alert
//! for the same key was promoted within the cooldown.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AlertConfig;
use crate::insights::{AggregatedInsight, Category, Severity};

/// Confidence at which a high-severity insight alerts in any category.
pub const HIGH_SEVERITY_ALERT_CONFIDENCE: f64 = 0.8;

/// Cooldown key, rendered as `session:category:type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub session_id: String,
    pub category: Category,
    pub insight_type: String,
}

impl AlertKey {
    pub fn for_insight(insight: &AggregatedInsight) -> Self {
        Self {
            session_id: insight.session_id.clone(),
            category: insight.category,
            insight_type: insight.insight_type.clone(),
        }
    }
}

impl std::fmt::Display for AlertKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.session_id, self.category, self.insight_type)
    }
}

/// Decides alert promotion and remembers the last promotion per key.
#[derive(Debug)]
pub struct AlertGate {
    config: AlertConfig,
    last_promoted: Mutex<HashMap<AlertKey, DateTime<Utc>>>,
}

impl AlertGate {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            last_promoted: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the insight should be promoted now.
    pub async fn should_alert(&self, insight: &AggregatedInsight) -> bool {
        self.should_alert_at(insight, Utc::now()).await
    }

    /// Whether the insight should be promoted at `now`. Records `now` for the
    /// key on promotion; leaves state untouched otherwise.
    pub async fn should_alert_at(&self, insight: &AggregatedInsight, now: DateTime<Utc>) -> bool {
        let key = AlertKey::for_insight(insight);
        let cooldown = self.config.cooldown();

        let mut last_promoted = self.last_promoted.lock().await;

        if let Some(last) = last_promoted.get(&key) {
            if now - *last < cooldown {
                debug!(key = %key, "Alert suppressed by cooldown");
                return false;
            }
        }

        if !self.passes_threshold(insight) {
            return false;
        }

        last_promoted.insert(key, now);
        true
    }

    fn passes_threshold(&self, insight: &AggregatedInsight) -> bool {
        let category_gate = match insight.category {
            Category::Fraud => insight.confidence >= self.config.fraud_alert_confidence,
            Category::Contradiction => {
                insight.confidence >= self.config.contradiction_alert_confidence
            }
            _ => false,
        };

        category_gate
            || (insight.severity == Severity::High
                && insight.confidence >= HIGH_SEVERITY_ALERT_CONFIDENCE)
    }

    /// Forget every key belonging to the session. Returns the number removed.
    pub async fn purge_session(&self, session_id: &str) -> usize {
        let mut last_promoted = self.last_promoted.lock().await;
        let before = last_promoted.len();
        last_promoted.retain(|key, _| key.session_id != session_id);
        before - last_promoted.len()
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.last_promoted.lock().await.len()
    }
}
