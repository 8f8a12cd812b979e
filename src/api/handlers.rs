//! Request handlers for the HTTP trigger.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::probe::InvocationResult;

use super::routes::ApiState;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status (always "ok" when responding)
    pub status: String,
}

/// Run one probe invocation.
///
/// Returns 200 with the success message, or 503 with the failed step and the
/// underlying error.
pub async fn ping_db_handler(State(state): State<ApiState>) -> (StatusCode, Json<InvocationResult>) {
    let outcome = state.probe.run().await;
    let result = InvocationResult::from_outcome(&outcome);

    let status = if result.is_success() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(result))
}

/// Liveness of the trigger itself. Never touches the database or the cache.
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok".to_string() }))
}
