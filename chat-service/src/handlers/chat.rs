use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ChatError;
use crate::services::metrics::record_chat_request;
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// `POST /chat`: relay one message through the model fallback chain.
#[tracing::instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let result = relay(&state, payload).await;
    record_chat_request(outcome(&result));
    result
}

async fn relay(
    state: &AppState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected chat body");
        ChatError::InvalidRequest
    })?;

    request.validate().map_err(|_| ChatError::InvalidRequest)?;

    let resolver = state.resolver.as_ref().ok_or(ChatError::Configuration)?;

    let generated = resolver.resolve(&request.message).await?;

    tracing::info!(
        model = %generated.model,
        attempts = generated.attempts,
        response_len = generated.text.len(),
        "Chat response generated"
    );

    Ok(Json(ChatResponse {
        response: generated.text,
    }))
}

fn outcome(result: &Result<Json<ChatResponse>, ChatError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ChatError::InvalidRequest) => "invalid_request",
        Err(ChatError::Configuration) => "not_configured",
        Err(ChatError::QuotaExhausted { .. }) => "quota_exhausted",
        Err(ChatError::AllModelsFailed { .. }) => "failed",
    }
}
