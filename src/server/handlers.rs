use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::SharedState;
use crate::error::{RpcError, RpcResult};
use crate::insights::{Category, InsightData, RawInsight};

/// Assessment window when the caller does not give one.
pub const DEFAULT_ASSESSMENT_MINUTES: u32 = 30;

/// Route a method call to its handler.
pub async fn handle_method(
    state: &SharedState,
    method: &str,
    params: Option<Value>,
) -> RpcResult<Value> {
    match method {
        "insights/receive" => handle_receive(state, params).await,
        "insights/aggregate" => handle_aggregate(state, params).await,
        "insights/assessment" => handle_assessment(state, params).await,
        "insights/clear" => handle_clear(state, params).await,
        "insights/buffer_status" => handle_buffer_status(state, params).await,
        "health" => Ok(json!({
            "status": "healthy",
            "service": state.config.service.name,
        })),
        "health/ready" => handle_ready(state).await,
        "ping" => Ok(Value::Object(Map::new())),
        _ => Err(RpcError::UnknownMethod {
            method: method.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct SessionParams {
    #[serde(alias = "round_id")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ReceiveParams {
    #[serde(alias = "round_id")]
    session_id: String,
    source: String,
    #[serde(rename = "type")]
    insight_type: String,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    data: InsightData,
}

#[derive(Debug, Deserialize)]
struct AssessmentParams {
    #[serde(alias = "round_id")]
    session_id: String,
    #[serde(default)]
    duration_minutes: Option<u32>,
}

/// Buffer one raw insight pushed by a producer.
async fn handle_receive(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: ReceiveParams = parse_params("insights/receive", params)?;
    let session_id = non_empty_session("insights/receive", params.session_id)?;

    let mut insight = RawInsight::new(&session_id, params.source, params.insight_type, params.data);
    insight.category = params.category;
    let buffer_size = state.engine.add_insight(insight).await;

    Ok(json!({
        "status": "received",
        "session_id": session_id,
        "buffer_size": buffer_size,
    }))
}

/// On-demand aggregation; leaves the buffer intact.
async fn handle_aggregate(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: SessionParams = parse_params("insights/aggregate", params)?;
    let batch = state.engine.aggregate(&params.session_id).await;
    serde_json::to_value(batch).map_err(RpcError::Json)
}

async fn handle_assessment(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: AssessmentParams = parse_params("insights/assessment", params)?;
    let assessment = state
        .engine
        .assessment(
            &params.session_id,
            params.duration_minutes.unwrap_or(DEFAULT_ASSESSMENT_MINUTES),
        )
        .await;
    serde_json::to_value(assessment).map_err(RpcError::Json)
}

/// Round ended or was cancelled.
async fn handle_clear(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: SessionParams = parse_params("insights/clear", params)?;
    state.engine.clear(&params.session_id).await;
    Ok(json!({
        "status": "cleared",
        "session_id": params.session_id,
    }))
}

async fn handle_buffer_status(state: &SharedState, params: Option<Value>) -> RpcResult<Value> {
    let params: SessionParams = parse_params("insights/buffer_status", params)?;
    let buffer_size = state.engine.buffer_size(&params.session_id).await;
    Ok(json!({
        "session_id": params.session_id,
        "buffer_size": buffer_size,
        "timestamp": Utc::now(),
    }))
}

async fn handle_ready(state: &SharedState) -> RpcResult<Value> {
    match state.store.ping().await {
        Ok(()) => Ok(json!({ "status": "ready" })),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            Ok(json!({ "status": "not_ready", "reason": e.to_string() }))
        }
    }
}

fn non_empty_session(method: &str, session_id: String) -> RpcResult<String> {
    if session_id.trim().is_empty() {
        return Err(RpcError::InvalidParams {
            method: method.to_string(),
            message: "session_id must not be empty".to_string(),
        });
    }
    Ok(session_id)
}

fn parse_params<T: serde::de::DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> RpcResult<T> {
    info!(method = %method, "Handling request");
    match params {
        Some(params) => serde_json::from_value(params).map_err(|e| RpcError::InvalidParams {
            method: method.to_string(),
            message: e.to_string(),
        }),
        None => Err(RpcError::InvalidParams {
            method: method.to_string(),
            message: "Missing params".to_string(),
        }),
    }
}
