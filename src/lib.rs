//! # Insight Aggregator
//!
//! Live interview insight aggregation. Upstream analyzers (speech, video,
//! fraud detection, NLP) emit raw observations about an interview session;
//! this crate buffers them per session, scores and deduplicates them into
//! aggregated insights, promotes the serious ones to rate-limited alerts and
//! derives interviewer recommendations.
//!
//! ## Architecture
//!
//! ```text
//! Feeds (JSON lines) → IngestScheduler ─┐
//! JSON-RPC (stdio)  ────────────────────┤→ AggregationEngine
//!                                       │        ↓
//!                   AggregationScheduler ─→ BatchPublisher (webhook / log)
//!                                       └─→ SQLite (alerts, recommendations)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use insight_aggregator::{AggregationEngine, Config};
//! use insight_aggregator::insights::{InsightData, RawInsight};
//!
//! let engine = AggregationEngine::new(&Config::default());
//! engine
//!     .add_insight(RawInsight::new(
//!         "r1",
//!         "fraud-detection",
//!         "multiple_faces",
//!         InsightData::new().with("confidence", 0.9),
//!     ))
//!     .await;
//! let batch = engine.aggregate("r1").await;
//! ```

/// Aggregation pipeline and engine.
pub mod aggregation;
/// Command line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Batch delivery to downstream consumers.
pub mod delivery;
/// Error types and result aliases for the application.
pub mod error;
/// Insight data model.
pub mod insights;
/// Feed ingestion and periodic aggregation loops.
pub mod scheduler;
/// JSON-RPC server and request handling.
pub mod server;
/// SQLite persistence of alerts and recommendations.
pub mod storage;

pub use aggregation::AggregationEngine;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, RpcServer, SharedState};
