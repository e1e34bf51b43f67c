use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

use super::{InsightContent, InsightStore, StoredInsight, StoredRecommendation};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::insights::{AggregatedInsight, Recommendation};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed insight store
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file and run migrations
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Private in-memory database, mainly for tests
    pub async fn new_in_memory() -> StorageResult<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Query {
        message: format!("Failed to serialize content: {}", e),
    })
}

#[async_trait]
impl InsightStore for SqliteStorage {
    async fn persist_insight(&self, insight: &AggregatedInsight) -> StorageResult<()> {
        let row = StoredInsight::from_insight(insight);
        let content = to_json(&row.content)?;

        sqlx::query(
            r#"
            INSERT INTO live_insights (
                id, session_id, insight_id, insight_type, category, severity,
                confidence_score, content, source_service, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.session_id)
        .bind(&row.insight_id)
        .bind(&row.insight_type)
        .bind(row.category.as_str())
        .bind(row.severity.as_str())
        .bind(row.confidence)
        .bind(&content)
        .bind(row.source_services.join(","))
        .bind(row.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn persist_recommendation(
        &self,
        session_id: &str,
        recommendation: &Recommendation,
    ) -> StorageResult<()> {
        let row = StoredRecommendation::new(session_id, recommendation);
        let content = to_json(&row.recommendation)?;

        sqlx::query(
            r#"
            INSERT INTO ai_recommendations (
                id, session_id, recommendation_type, priority, content, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.session_id)
        .bind(row.kind.as_str())
        .bind(row.priority.as_str())
        .bind(&content)
        .bind(&row.status)
        .bind(row.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn session_insights(&self, session_id: &str) -> StorageResult<Vec<StoredInsight>> {
        let rows: Vec<InsightRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, insight_id, insight_type, category, severity,
                   confidence_score, content, source_service, created_at
            FROM live_insights
            WHERE session_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredInsight::try_from).collect()
    }

    async fn session_recommendations(
        &self,
        session_id: &str,
    ) -> StorageResult<Vec<StoredRecommendation>> {
        let rows: Vec<RecommendationRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, recommendation_type, priority, content, status, created_at
            FROM ai_recommendations
            WHERE session_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredRecommendation::try_from).collect()
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Internal row types for SQLx mapping

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!(error = %e, value = raw, "Unparseable stored timestamp");
            Utc::now()
        })
}

fn parse_column<T: FromStr<Err = String>>(column: &str, raw: &str) -> StorageResult<T> {
    raw.parse().map_err(|e: String| StorageError::Query {
        message: format!("Invalid {} column: {}", column, e),
    })
}

#[derive(sqlx::FromRow)]
struct InsightRow {
    id: String,
    session_id: String,
    insight_id: String,
    insight_type: String,
    category: String,
    severity: String,
    confidence_score: f64,
    content: String,
    source_service: String,
    created_at: String,
}

impl TryFrom<InsightRow> for StoredInsight {
    type Error = StorageError;

    fn try_from(row: InsightRow) -> StorageResult<Self> {
        let content: InsightContent =
            serde_json::from_str(&row.content).map_err(|e| StorageError::Query {
                message: format!("Invalid insight content: {}", e),
            })?;

        Ok(Self {
            id: row.id,
            session_id: row.session_id,
            insight_id: row.insight_id,
            insight_type: row.insight_type,
            category: parse_column("category", &row.category)?,
            severity: parse_column("severity", &row.severity)?,
            confidence: row.confidence_score,
            content,
            source_services: row
                .source_service
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            created_at: parse_timestamp(&row.created_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct RecommendationRow {
    id: String,
    session_id: String,
    recommendation_type: String,
    priority: String,
    content: String,
    status: String,
    created_at: String,
}

impl TryFrom<RecommendationRow> for StoredRecommendation {
    type Error = StorageError;

    fn try_from(row: RecommendationRow) -> StorageResult<Self> {
        let recommendation: Recommendation =
            serde_json::from_str(&row.content).map_err(|e| StorageError::Query {
                message: format!("Invalid recommendation content: {}", e),
            })?;

        Ok(Self {
            id: row.id,
            session_id: row.session_id,
            kind: parse_column("recommendation_type", &row.recommendation_type)?,
            priority: parse_column("priority", &row.priority)?,
            recommendation,
            status: row.status,
            created_at: parse_timestamp(&row.created_at),
        })
    }
}
