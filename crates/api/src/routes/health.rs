//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Static facts about the running service, reported by the health check.
#[derive(Debug, Clone, Copy)]
pub struct ServiceInfo {
    /// Which store backend is wired in: `"memory"` or `"postgres"`.
    pub storage: &'static str,
    /// Whether bookings are checked against the doctor's slots.
    pub enforce_availability: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
    pub enforce_availability: bool,
}

/// GET /health: returns service health and configuration summary.
pub async fn check(State(info): State<ServiceInfo>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: info.storage,
        enforce_availability: info.enforce_availability,
    })
}
