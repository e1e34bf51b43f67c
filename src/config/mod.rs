use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Largest accepted value for second-valued settings (one year).
pub const MAX_DURATION_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub aggregation: AggregationConfig,
    pub alerts: AlertConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub delivery: DeliveryConfig,
    pub ingest: IngestConfig,
}

/// Service identity
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

/// Buffer window and batch shaping
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub window_seconds: u64,
    pub min_confidence_threshold: f64,
    pub max_insights_per_batch: usize,
    pub generate_recommendations: bool,
    pub max_recommendations_per_round: usize,
}

/// Alert promotion thresholds and cooldown
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub fraud_alert_confidence: f64,
    pub contradiction_alert_confidence: f64,
    pub min_alert_interval_seconds: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Batch delivery configuration
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Webhook endpoint; batches are only logged when unset.
    pub webhook_url: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// External feed consumption
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub feeds: Vec<PathBuf>,
    pub poll_timeout_ms: u64,
    pub batch_size: usize,
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_or(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let service = ServiceConfig {
            name: env::var("SERVICE_NAME").unwrap_or_else(|_| "insight-aggregator".to_string()),
        };

        let aggregation = AggregationConfig {
            window_seconds: parsed_or("INSIGHT_WINDOW_SECONDS", 30),
            min_confidence_threshold: parsed_or("MIN_CONFIDENCE_THRESHOLD", 0.7),
            max_insights_per_batch: parsed_or("MAX_INSIGHTS_PER_BATCH", 10),
            generate_recommendations: flag_or("GENERATE_RECOMMENDATIONS", true),
            max_recommendations_per_round: parsed_or("MAX_RECOMMENDATIONS_PER_ROUND", 5),
        };

        let alerts = AlertConfig {
            fraud_alert_confidence: parsed_or("FRAUD_ALERT_CONFIDENCE", 0.85),
            contradiction_alert_confidence: parsed_or("CONTRADICTION_ALERT_CONFIDENCE", 0.80),
            min_alert_interval_seconds: parsed_or("MIN_ALERT_INTERVAL_SECONDS", 60),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/insights.db".to_string()),
            ),
            max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let delivery = DeliveryConfig {
            webhook_url: env::var("DELIVERY_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            timeout_ms: parsed_or("DELIVERY_TIMEOUT_MS", 5000),
            max_retries: parsed_or("DELIVERY_MAX_RETRIES", 2),
            retry_delay_ms: parsed_or("DELIVERY_RETRY_DELAY_MS", 250),
        };

        let ingest = IngestConfig {
            feeds: env::var("INGEST_FEEDS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .unwrap_or_default(),
            poll_timeout_ms: parsed_or("INGEST_POLL_TIMEOUT_MS", 5000),
            batch_size: parsed_or("INGEST_BATCH_SIZE", 20),
        };

        let config = Config {
            service,
            aggregation,
            alerts,
            database,
            logging,
            delivery,
            ingest,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject threshold and sizing values the engine cannot work with.
    pub fn validate(&self) -> Result<(), AppError> {
        let unit_ranges = [
            (
                "MIN_CONFIDENCE_THRESHOLD",
                self.aggregation.min_confidence_threshold,
            ),
            ("FRAUD_ALERT_CONFIDENCE", self.alerts.fraud_alert_confidence),
            (
                "CONTRADICTION_ALERT_CONFIDENCE",
                self.alerts.contradiction_alert_confidence,
            ),
        ];
        for (key, value) in unit_ranges {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config {
                    message: format!("{} must be within [0, 1], got {}", key, value),
                });
            }
        }

        if self.aggregation.window_seconds == 0 {
            return Err(AppError::Config {
                message: "INSIGHT_WINDOW_SECONDS must be positive".to_string(),
            });
        }
        let durations = [
            ("INSIGHT_WINDOW_SECONDS", self.aggregation.window_seconds),
            (
                "MIN_ALERT_INTERVAL_SECONDS",
                self.alerts.min_alert_interval_seconds,
            ),
        ];
        for (key, value) in durations {
            if value > MAX_DURATION_SECONDS {
                return Err(AppError::Config {
                    message: format!(
                        "{} must be at most {}, got {}",
                        key, MAX_DURATION_SECONDS, value
                    ),
                });
            }
        }
        if self.aggregation.max_insights_per_batch == 0 {
            return Err(AppError::Config {
                message: "MAX_INSIGHTS_PER_BATCH must be positive".to_string(),
            });
        }
        if self.ingest.batch_size == 0 || self.ingest.poll_timeout_ms == 0 {
            return Err(AppError::Config {
                message: "INGEST_BATCH_SIZE and INGEST_POLL_TIMEOUT_MS must be positive"
                    .to_string(),
            });
        }

        Ok(())
    }
}

impl AggregationConfig {
    /// Records older than twice the window are evicted from the buffer.
    pub fn retention(&self) -> chrono::Duration {
        seconds_delta(self.window_seconds.saturating_mul(2))
    }

    /// Sleep between two periodic aggregation ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.window_seconds.saturating_mul(1000) / 2)
    }
}

impl AlertConfig {
    /// Minimum spacing between two alerts sharing a key.
    pub fn cooldown(&self) -> chrono::Duration {
        seconds_delta(self.min_alert_interval_seconds)
    }
}

/// Seconds as a signed delta, saturating at chrono's maximum.
fn seconds_delta(seconds: u64) -> chrono::Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

impl IngestConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "insight-aggregator".to_string(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            window_seconds: 30,
            min_confidence_threshold: 0.7,
            max_insights_per_batch: 10,
            generate_recommendations: true,
            max_recommendations_per_round: 5,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            fraud_alert_confidence: 0.85,
            contradiction_alert_confidence: 0.80,
            min_alert_interval_seconds: 60,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/insights.db"),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 5000,
            max_retries: 2,
            retry_delay_ms: 250,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            poll_timeout_ms: 5000,
            batch_size: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            aggregation: AggregationConfig::default(),
            alerts: AlertConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            delivery: DeliveryConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}
