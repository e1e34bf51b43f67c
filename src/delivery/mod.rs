//! Hand-off of aggregated batches to downstream consumers.

mod webhook;

pub use webhook::WebhookPublisher;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::DeliveryConfig;
use crate::error::DeliveryResult;
use crate::insights::InsightBatch;

/// Channel a session's batches are published on.
pub fn batch_channel(session_id: &str) -> String {
    format!("insights:aggregated:{}", session_id)
}

/// Destination for aggregated batches.
#[async_trait]
pub trait BatchPublisher: Send + Sync {
    /// Publish one session's batch.
    async fn publish_batch(&self, session_id: &str, batch: &InsightBatch) -> DeliveryResult<()>;
}

/// Publisher that writes batches to the log. Used when no endpoint is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait]
impl BatchPublisher for LogPublisher {
    async fn publish_batch(&self, session_id: &str, batch: &InsightBatch) -> DeliveryResult<()> {
        let payload = serde_json::to_string(batch)?;
        info!(
            channel = %batch_channel(session_id),
            insights = batch.insights.len(),
            alerts = batch.summary.alerts_count,
            batch = %payload,
            "Published insight batch"
        );
        Ok(())
    }
}

/// Webhook publisher when a URL is configured, log publisher otherwise.
pub fn publisher_from_config(config: &DeliveryConfig) -> DeliveryResult<Arc<dyn BatchPublisher>> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookPublisher::new(url, config)?)),
        None => Ok(Arc::new(LogPublisher)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_channel() {
        assert_eq!(batch_channel("r1"), "insights:aggregated:r1");
    }

    #[tokio::test]
    async fn test_log_publisher_accepts_batch() {
        let publisher = LogPublisher;
        let batch = InsightBatch::empty("r1");
        assert!(publisher.publish_batch("r1", &batch).await.is_ok());
    }

    #[test]
    fn test_publisher_from_config_without_url() {
        let config = DeliveryConfig::default();
        assert!(publisher_from_config(&config).is_ok());
    }
}
