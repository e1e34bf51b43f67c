//! Per-session buffer of raw insights with window-based eviction.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::insights::RawInsight;

/// Session id → raw insights in arrival order.
///
/// Eviction runs on every [`RoundBuffer::add`]: records received before
/// `now - retention` are dropped from the session being written to. Sessions
/// that stop receiving records keep their data until [`RoundBuffer::clear`].
#[derive(Debug)]
pub struct RoundBuffer {
    retention: Duration,
    sessions: RwLock<HashMap<String, Vec<RawInsight>>>,
}

impl RoundBuffer {
    /// Create a buffer retaining records for `retention` (twice the window).
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Store a record stamped with the current time. Returns the session's
    /// buffer size after eviction.
    pub async fn add(&self, insight: RawInsight) -> usize {
        self.add_at(insight, Utc::now()).await
    }

    /// Store a record stamped with `received_at` and evict relative to it.
    pub async fn add_at(&self, mut insight: RawInsight, received_at: DateTime<Utc>) -> usize {
        insight.received_at = received_at;
        let cutoff = received_at
            .checked_sub_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut sessions = self.sessions.write().await;
        let records = sessions.entry(insight.session_id.clone()).or_default();
        records.push(insight);

        let before = records.len();
        records.retain(|r| r.received_at > cutoff);
        let evicted = before - records.len();
        if evicted > 0 {
            debug!(evicted, remaining = records.len(), "Evicted stale insights");
        }

        records.len()
    }

    /// Copy of the session's current records, without evicting.
    pub async fn snapshot(&self, session_id: &str) -> Vec<RawInsight> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop the session entirely. Returns the number of records removed.
    pub async fn clear(&self, session_id: &str) -> usize {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    /// Number of buffered records for the session.
    pub async fn size(&self, session_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Session ids with at least one buffered record.
    pub async fn active_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
