//! Request handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use pagesmith_core::{BuildRequest, NotificationPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::router::BUILD_PATH;
use super::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Discovery response
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub endpoints: Vec<String>,
}

/// Liveness and endpoint listing
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "LLM Deployment API is live!".to_string(),
        endpoints: vec![
            format!("POST {BUILD_PATH}"),
            "GET /health".to_string(),
        ],
    })
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Run one build request to completion.
///
/// Responds only after the evaluator has been notified (or notification
/// was exhausted), so the caller sees the same payload the evaluator got.
/// Any body that parses as JSON is accepted, whatever its content type.
/// The secret is checked before the fields are decoded into a
/// [`BuildRequest`].
pub async fn build(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<NotificationPayload>> {
    let value: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state
        .orchestrator
        .authenticate(value.get("secret").and_then(Value::as_str))?;

    let request: BuildRequest =
        serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::info!(
        task = request.task.as_deref().unwrap_or_default(),
        round = request.round.unwrap_or(1),
        "received build request"
    );

    let payload = state.orchestrator.handle(&request).await?;
    Ok(Json(payload))
}
