//! API handlers.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::trace::TraceConfig;

/// Body of `POST /trace`.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceRequest {
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub show_headers: bool,
    #[serde(default)]
    pub show_body: bool,
}

impl TraceRequest {
    /// Engine input for this request; each header becomes a `"Key: Value"` line.
    pub fn to_config(&self) -> TraceConfig {
        TraceConfig {
            method: self.method.clone(),
            headers: self
                .headers
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect(),
            body: self.body.clone(),
            show_headers: self.show_headers,
            show_body: self.show_body,
        }
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

/// JSON error body, `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<TraceError> for ApiError {
    fn from(err: TraceError) -> Self {
        let status = match &err {
            TraceError::RequestConstruction(_) => StatusCode::BAD_REQUEST,
            TraceError::Transport(_) => StatusCode::BAD_GATEWAY,
            TraceError::Setup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

/// `POST /trace`: run the engine and return the trace tree.
pub async fn trace(
    State(state): State<AppState>,
    payload: Result<Json<TraceRequest>, JsonRejection>,
) -> Response {
    let start_time = Instant::now();
    let response = match run_trace(&state, payload).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(status = %err.status, error = %err.message, "Trace request failed");
            err.into_response()
        }
    };
    metrics::record_api_request(response.status().as_u16(), start_time);
    response
}

async fn run_trace(
    state: &AppState,
    payload: Result<Json<TraceRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
    if request.url.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "url is required"));
    }

    tracing::debug!(url = %request.url, method = %request.method, "Tracing");
    let config = request.to_config();
    let trace = state.tracer.trace(&request.url, &config).await?;
    Ok((StatusCode::OK, Json(trace)).into_response())
}
