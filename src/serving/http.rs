//! HTTP surface over the inference service.

use super::service::{HealthReport, InferenceService, LoadOutcome, ScoreResult};
use crate::error::FraudError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub model_loaded: bool,
}

#[derive(Debug)]
pub enum ApiError {
    ModelUnavailable,
    Validation(String),
    Internal,
}

impl From<FraudError> for ApiError {
    fn from(err: FraudError) -> Self {
        match err {
            FraudError::ModelUnavailable => ApiError::ModelUnavailable,
            FraudError::InvalidInput(msg) => ApiError::Validation(msg),
            _ => ApiError::Internal,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ModelUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Model not loaded".to_string()),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal processing error".to_string(),
            ),
        };
        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

pub fn router(service: Arc<InferenceService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/admin/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health())
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<ScoreResult>, ApiError> {
    let Json(req) = body?;
    // CPU-bound and short; scored inline.
    let result = state.service.score(&req.features)?;
    Ok(Json(result))
}

async fn reload(State(state): State<AppState>) -> Json<ReloadResponse> {
    let outcome = state.service.load_in_background().await;
    let (label, version) = match outcome {
        LoadOutcome::Loaded(v) => ("loaded", Some(v.0)),
        LoadOutcome::Failed(_) => ("failed", None),
        LoadOutcome::Superseded => ("superseded", None),
        LoadOutcome::Stopped => ("stopped", None),
    };
    Json(ReloadResponse {
        outcome: label,
        version,
        model_loaded: state.service.health().model_loaded,
    })
}
