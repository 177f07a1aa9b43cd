//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use persona_types::error::ChatError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Conversation, feedback, and review errors.
    Chat(ChatError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl AppError {
    /// Status, machine-readable code, and message for the envelope.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(e @ ChatError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            }
            AppError::Chat(e @ ChatError::InactiveBot(_)) => {
                (StatusCode::FORBIDDEN, "BOT_INACTIVE", e.to_string())
            }
            AppError::Chat(ChatError::AlreadyFeedback) => (
                StatusCode::CONFLICT,
                "ALREADY_FEEDBACK",
                "You have already given feedback for this message.".to_string(),
            ),
            AppError::Chat(e @ ChatError::InvalidFeedbackTarget(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Chat(e @ ChatError::NotConfigured(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_NOT_CONFIGURED", e.to_string())
            }
            AppError::Chat(e @ (ChatError::RequestFailed { .. } | ChatError::MalformedResponse(_))) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.to_string())
            }
            AppError::Chat(e @ ChatError::PersistenceFailed(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR", e.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "Request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ChatError::NotFound("session 'x'".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ChatError::InactiveBot("cabin".into()), StatusCode::FORBIDDEN, "BOT_INACTIVE"),
            (ChatError::AlreadyFeedback, StatusCode::CONFLICT, "ALREADY_FEEDBACK"),
            (ChatError::InvalidFeedbackTarget(0), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                ChatError::PersistenceFailed("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let (s, c, _) = AppError::from(err).parts();
            assert_eq!((s, c), (status, code));
        }
    }

    #[test]
    fn test_into_response_status() {
        let resp = AppError::Unauthorized("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
