//! Callback HTTP endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::checks::{CallbackChecker, CallbackRequest, CheckResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub results: Vec<CheckResult>,
}

pub fn create_router(checker: CallbackChecker) -> Router {
    Router::new()
        .route("/evaluate_callback", post(evaluate_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(checker)
}

/// Accepts any body that parses as JSON, whatever its content type.
async fn evaluate_callback(
    State(checker): State<CallbackChecker>,
    body: Bytes,
) -> Result<Json<EvaluationResponse>, (StatusCode, Json<Value>)> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| bad_request(e.to_string()))?;
    tracing::info!(payload = %payload, "received callback");

    let request: CallbackRequest =
        serde_json::from_value(payload).map_err(|e| bad_request(e.to_string()))?;
    let results = checker.run(&request).await;
    tracing::info!(results = ?results, "evaluation finished");

    Ok(Json(EvaluationResponse { results }))
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}
