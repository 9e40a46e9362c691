//! Reaction extraction route.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use reactminer_core::{Error, SamplingOverrides};
use reactminer_runtime::BatchInput;
use serde::Deserialize;
use tracing::error;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/extract", post(extract))
}

/// Incoming extraction request.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub texts: BatchInput,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub sampling: Option<SamplingOverrides>,
}

fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message })))
}

/// POST /api/extract: run a batch and return the segments with reactions.
async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> impl IntoResponse {
    let sampling = match req.sampling {
        Some(overrides) => match overrides.apply(&state.config.sampling) {
            Ok(s) => s,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => state.config.sampling.clone(),
    };

    let started = Instant::now();
    let worker = state.clone();
    let joined = tokio::task::spawn_blocking(move || {
        worker.run_batch(req.texts, req.instruction, &sampling)
    })
    .await;

    match joined {
        Ok(Ok(outcome)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "results": outcome.results,
                "processed": outcome.processed,
                "failures": outcome.failures,
                "duration": started.elapsed().as_millis() as u64,
            })),
        ),
        Ok(Err(e @ (Error::InvalidSamplingOption(_) | Error::Config(_)))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            error!("Extraction batch failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(e) => {
            error!("Extraction task panicked: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Extraction task failed".into(),
            )
        }
    }
}
