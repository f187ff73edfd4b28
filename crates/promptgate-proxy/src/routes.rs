//! HTTP routes and handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use promptgate_core::{Action, Error, HistoryEntry};
use promptgate_telemetry::{metrics, Adapter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::state::AppState;

pub fn create_router(state: AppState, config: &HttpConfig) -> Router {
    Router::new()
        .route("/mitigate", post(mitigate))
        .route("/reload", post(reload))
        .route("/history", get(history))
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
        .with_state(state)
}

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_PURPOSE: &str = "general";

/// Body of `POST /mitigate`
#[derive(Debug, Deserialize)]
struct MitigateRequest {
    prompt: Option<String>,
    user_id: Option<String>,
    model: Option<Value>,
    purpose: Option<Value>,
    headers: Option<Value>,
}

#[derive(Debug, Serialize)]
struct MitigateResponse {
    action: Action,
    prompt_out: String,
    reason: String,
    user_id: String,
}

async fn mitigate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MitigateResponse>, AppError> {
    let request_id = Uuid::new_v4();
    handle_mitigate(state, body)
        .instrument(info_span!("mitigate", %request_id))
        .await
}

async fn handle_mitigate(state: AppState, body: Bytes) -> Result<Json<MitigateResponse>, AppError> {
    let value: Value = serde_json::from_slice(&body)?;
    if !value.is_object() {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }
    let req: MitigateRequest = serde_json::from_value(value)?;

    let (prompt, user_id) = required_fields(req.prompt, req.user_id)?;

    // Any JSON type is accepted here; null counts as absent
    let model = req.model.unwrap_or_else(|| json!(DEFAULT_MODEL));
    let purpose = req.purpose.unwrap_or_else(|| json!(DEFAULT_PURPOSE));
    let headers = req.headers.unwrap_or_else(|| json!({}));
    info!(
        user_id = %user_id,
        model = %model,
        purpose = %purpose,
        headers = %headers,
        "Received mitigation request"
    );

    let decision = state.moderate(Adapter::Http, &user_id, &prompt).await;

    Ok(Json(MitigateResponse {
        action: decision.action,
        prompt_out: decision.prompt_out,
        reason: decision.reason,
        user_id,
    }))
}

fn required_fields(
    prompt: Option<String>,
    user_id: Option<String>,
) -> promptgate_core::Result<(String, String)> {
    match (prompt, user_id) {
        (Some(prompt), Some(user_id)) if !prompt.is_empty() && !user_id.is_empty() => {
            Ok((prompt, user_id))
        }
        _ => Err(Error::request("Missing required fields: prompt and user_id")),
    }
}

async fn reload(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    info!(path = %state.engine.policy_path().display(), "Reloading policy");
    match state.engine.reload().await {
        Ok(()) => {
            metrics::record_reload(true);
            Ok(Json(json!({ "message": "Policy reloaded successfully" })))
        }
        Err(e) => {
            metrics::record_reload(false);
            Err(AppError::Internal(format!("Failed to reload policy: {}", e)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    n: Option<i64>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let n = query.n.unwrap_or(0);

    Ok(Json(HistoryResponse {
        history: state.history.recent(n),
    }))
}

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Request(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => {
                metrics::record_error(Adapter::Http, "request");
                warn!(error = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::Internal(msg) => {
                metrics::record_error(Adapter::Http, "internal");
                warn!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
