//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

/// Live interview insight aggregator.
#[derive(Parser, Debug, Clone)]
#[command(name = "insight-aggregator", version, about)]
pub struct Cli {
    /// JSON-lines feed to consume (repeatable, added to INGEST_FEEDS)
    #[arg(long = "feed", value_name = "PATH")]
    pub feeds: Vec<PathBuf>,

    /// Do not serve requests on stdio; run until interrupted
    #[arg(long)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands. Without one the service runs.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print the effective configuration and exit
    Config,
}

impl Cli {
    /// Fold command line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        for feed in &self.feeds {
            if !config.ingest.feeds.contains(feed) {
                config.ingest.feeds.push(feed.clone());
            }
        }
    }
}

/// Human-readable configuration dump.
pub fn describe_config(config: &Config) -> String {
    let mut output = String::new();
    output.push_str(&format!("Service: {}\n", config.service.name));
    output.push_str("\nAggregation:\n");
    output.push_str(&format!("  Window: {}s\n", config.aggregation.window_seconds));
    output.push_str(&format!(
        "  Min Confidence: {:.2}\n",
        config.aggregation.min_confidence_threshold
    ));
    output.push_str(&format!(
        "  Max Insights/Batch: {}\n",
        config.aggregation.max_insights_per_batch
    ));
    output.push_str(&format!(
        "  Recommendations: {} (max {})\n",
        config.aggregation.generate_recommendations, config.aggregation.max_recommendations_per_round
    ));
    output.push_str("\nAlerts:\n");
    output.push_str(&format!(
        "  Fraud Confidence: {:.2}\n",
        config.alerts.fraud_alert_confidence
    ));
    output.push_str(&format!(
        "  Contradiction Confidence: {:.2}\n",
        config.alerts.contradiction_alert_confidence
    ));
    output.push_str(&format!(
        "  Cooldown: {}s\n",
        config.alerts.min_alert_interval_seconds
    ));
    output.push_str(&format!("\nDatabase: {}\n", config.database.path.display()));
    output.push_str(&format!(
        "Delivery: {}\n",
        config.delivery.webhook_url.as_deref().unwrap_or("log only")
    ));
    output.push_str(&format!("Feeds: {}\n", config.ingest.feeds.len()));
    for feed in &config.ingest.feeds {
        output.push_str(&format!("  - {}\n", feed.display()));
    }
    output
}
