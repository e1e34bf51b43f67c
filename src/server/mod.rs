//! Request/response surface.
//!
//! JSON-RPC 2.0 over stdio: one request per line in, one response per line
//! out. Handlers run directly against the shared aggregation engine.

mod handlers;
mod rpc;

pub use handlers::*;
pub use rpc::*;

use std::sync::Arc;

use crate::aggregation::AggregationEngine;
use crate::config::Config;
use crate::storage::InsightStore;

/// State shared by the request handlers and the background loops.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Aggregation engine shared with the schedulers.
    pub engine: Arc<AggregationEngine>,
    /// Persistence backend.
    pub store: Arc<dyn InsightStore>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<AggregationEngine>, store: Arc<dyn InsightStore>) -> Self {
        Self {
            config,
            engine,
            store,
        }
    }
}

/// Shared application state handle.
pub type SharedState = Arc<AppState>;
