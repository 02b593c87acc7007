use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

/// Liveness check. Reports whether a provider key is configured but stays
/// healthy without one.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "chat-service",
        "version": env!("CARGO_PKG_VERSION"),
        "provider_configured": state.resolver.is_some(),
    }))
}
