//! Liveness endpoints
//!
//! - `/` - Plain-text banner
//! - `/health` - JSON status with uptime and the number of loaded records

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::response::{json_response, text_response, BoxBody};
use crate::db::DbStats;
use crate::server::AppState;

pub const ROOT_BANNER: &str = "JananiSetu Backend Server is Running!";

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: String,
    pub mode: &'static str,
    /// Records currently held by the care store
    pub mothers_loaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DbStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let mothers_loaded = state.care_read().map(|store| store.len()).unwrap_or(0);

    let (database, error) = match state.db.stats() {
        Ok(stats) => (Some(stats), None),
        Err(e) => {
            tracing::warn!("Health check: database unavailable: {}", e);
            (None, Some("Database unavailable".to_string()))
        }
    };

    HealthResponse {
        healthy: error.is_none(),
        status: if error.is_none() { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        mothers_loaded,
        database,
        error,
    }
}

/// GET /
pub fn root(state: &AppState) -> Response<BoxBody> {
    text_response(StatusCode::OK, ROOT_BANNER, state.origin())
}

/// GET /health
pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let health = build_health_response(state);
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, &health, state.origin())
}
