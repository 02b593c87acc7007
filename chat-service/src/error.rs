use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to `/chat` callers. Each renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is required")]
    InvalidRequest,

    #[error("Gemini API key not configured. Please set GEMINI_API_KEY environment variable.")]
    Configuration,

    /// Every candidate failed and the last failure was quota related.
    #[error(
        "API quota exceeded or no models available. Tried: {}. Check your quota at https://ai.dev/usage?tab=rate-limit. Last error: {last_error}",
        .tried.join(", ")
    )]
    QuotaExhausted {
        tried: Vec<String>,
        last_error: String,
    },

    /// Every candidate failed for some other reason.
    #[error(
        "Failed to use any available model. Tried: {}. Errors: {}",
        .tried.join(", "),
        .errors.join(" | ")
    )]
    AllModelsFailed {
        tried: Vec<String>,
        errors: Vec<String>,
    },
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::InvalidRequest => StatusCode::BAD_REQUEST,
            ChatError::Configuration | ChatError::AllModelsFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ChatError::QuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Chat request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Chat request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_names_candidates() {
        let err = ChatError::QuotaExhausted {
            tried: vec!["a".into(), "b".into()],
            last_error: "Gemini API error 429: slow down".into(),
        };

        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.to_string(),
            "API quota exceeded or no models available. Tried: a, b. Check your quota at \
             https://ai.dev/usage?tab=rate-limit. Last error: Gemini API error 429: slow down"
        );
    }

    #[test]
    fn test_all_failed_message_lists_errors() {
        let err = ChatError::AllModelsFailed {
            tried: vec!["a".into(), "b".into()],
            errors: vec!["a: boom".into(), "b: bang".into()],
        };

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Failed to use any available model. Tried: a, b. Errors: a: boom | b: bang"
        );
    }
}
