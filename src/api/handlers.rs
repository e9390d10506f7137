//! Request handlers for the HTTP surface.

use crate::types::{AppError, OrchestratedResult, Result};
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// `POST /query`: run one orchestrated query.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<OrchestratedResult>> {
    if request.query.trim().is_empty() {
        return Err(AppError::InvalidInput("Query must not be empty".to_string()));
    }
    let result = state.orchestrator.process_query(&request.query).await;
    Ok(Json(result))
}
