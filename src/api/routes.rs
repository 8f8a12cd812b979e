use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::probe::ConnectivityProbe;

use super::handlers::{health_handler, ping_db_handler};

#[derive(Clone)]
pub struct ApiState {
    pub probe: Arc<ConnectivityProbe>,
}

pub fn build_router(probe: Arc<ConnectivityProbe>) -> Router {
    let state = ApiState { probe };

    Router::new()
        .route("/", get(ping_db_handler))
        .route("/ping-db", get(ping_db_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
