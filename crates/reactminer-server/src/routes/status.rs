//! Health and status routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/status: device, generator and default sampling settings.
async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let summary = state.context.summary();
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "accelerator": summary.accelerator,
        "precision": summary.precision,
        "generator": summary.generator,
        "generatorAvailable": summary.generator_available,
        "baseModel": summary.base_model,
        "adapter": summary.adapter,
        "backend": state.config.backend,
        "failurePolicy": state.config.failure_policy,
        "instruction": state.config.instruction,
        "sampling": state.config.sampling,
    }))
}
