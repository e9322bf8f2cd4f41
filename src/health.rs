//! Local endpoints that never reach a backend.
//!
//! The relay service answers `GET /` with a plain-text status derived
//! from its configuration and the poll task's liveness flag. The proxy
//! answers `GET /hello` with a fixed JSON greeting.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::RelayState;

pub const STATUS_ACTIVE: &str = "forwarding service is running and configured; scheduler active";
pub const STATUS_INACTIVE: &str = "forwarding service is running but the scheduler is not active";
pub const STATUS_UNCONFIGURED: &str =
    "forwarding service is running but not configured (missing environment variables)";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloResponse {
    pub message: String,
}

pub async fn hello_handler() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "hello".to_string(),
    })
}

#[must_use]
pub const fn relay_status(configured: bool, alive: bool) -> (StatusCode, &'static str) {
    match (configured, alive) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, STATUS_UNCONFIGURED),
        (true, true) => (StatusCode::OK, STATUS_ACTIVE),
        (true, false) => (StatusCode::INTERNAL_SERVER_ERROR, STATUS_INACTIVE),
    }
}

pub async fn relay_health_handler(
    State(state): State<Arc<RelayState>>,
) -> (StatusCode, &'static str) {
    relay_status(state.config.relay_configured(), state.task.is_alive())
}
