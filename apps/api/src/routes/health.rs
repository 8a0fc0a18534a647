use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::models::Stats;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "diversia-api"
    }))
}

#[derive(Debug, Serialize)]
pub struct SystemHealth {
    pub status: &'static str,
    pub storage_backend: &'static str,
    pub storage_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    pub email_configured: bool,
}

/// GET /api/health/system
/// Probes the store and reports which integrations are configured. Always
/// answers 200; a broken store shows up as `status: "degraded"`.
pub async fn system_health_handler(State(state): State<AppState>) -> Json<SystemHealth> {
    let (stats, storage_error) = match state.store.stats().await {
        Ok(stats) => (Some(stats), None),
        Err(e) => {
            warn!("System health: store unavailable: {e}");
            (None, Some(e.to_string()))
        }
    };
    let storage_ok = storage_error.is_none();

    Json(SystemHealth {
        status: if storage_ok { "ok" } else { "degraded" },
        storage_backend: state.store.backend(),
        storage_ok,
        storage_error,
        stats,
        email_configured: state.email.is_configured(),
    })
}
