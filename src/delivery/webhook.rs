use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{batch_channel, BatchPublisher};
use crate::config::DeliveryConfig;
use crate::error::{DeliveryError, DeliveryResult};
use crate::insights::InsightBatch;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    channel: String,
    batch: &'a InsightBatch,
}

/// Posts batches as JSON to an HTTP endpoint, retrying with exponential
/// backoff.
#[derive(Clone)]
pub struct WebhookPublisher {
    client: Client,
    url: String,
    timeout_ms: u64,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl WebhookPublisher {
    pub fn new(url: &str, config: &DeliveryConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(DeliveryError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout_ms: config.timeout_ms,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    /// Get the endpoint URL (for testing)
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, payload: &WebhookPayload<'_>) -> DeliveryResult<()> {
        debug!(
            channel = %payload.channel,
            insights = payload.batch.insights.len(),
            "Posting insight batch"
        );

        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    DeliveryError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl BatchPublisher for WebhookPublisher {
    async fn publish_batch(&self, session_id: &str, batch: &InsightBatch) -> DeliveryResult<()> {
        let payload = WebhookPayload {
            channel: batch_channel(session_id),
            batch,
        };

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(self.retry_delay_ms * (2_u64.pow(retries - 1)));
                warn!(
                    session_id = %session_id,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying batch delivery"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.send(&payload).await {
                Ok(()) => {
                    info!(
                        session_id = %session_id,
                        latency_ms = start.elapsed().as_millis(),
                        "Batch delivered"
                    );
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        session_id = %session_id,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Batch delivery failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(DeliveryError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }
}
