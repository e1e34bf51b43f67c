use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Batch delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("Endpoint error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Feed ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed message: {message}")]
    Malformed { message: String },

    #[error("Message has no session id")]
    MissingSession,

    #[error("Feed {feed} failed: {message}")]
    Feed { feed: String, message: String },
}

/// Request/response surface errors
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Invalid parameters for {method}: {message}")]
    InvalidParams { method: String, message: String },

    #[error("Method not found: {method}")]
    UnknownMethod { method: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RpcError {
    /// JSON-RPC 2.0 error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::InvalidParams { .. } => -32602,
            RpcError::UnknownMethod { .. } => -32601,
            RpcError::Json(_) => -32603,
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Result type alias for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type alias for RPC handlers
pub type RpcResult<T> = Result<T, RpcError>;
