use thiserror::Error;

use crate::llm::{ProviderError, status_suffix};

/// Errors surfaced by the conversation engine.
///
/// Every variant is scoped to one turn or one operation; none is fatal to
/// the process.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("chatbot '{0}' is not currently active")]
    InactiveBot(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("request failed{}: {message}", status_suffix(.status))]
    RequestFailed { status: Option<u16>, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("feedback already given for this message")]
    AlreadyFeedback,

    #[error("message {0} cannot receive feedback")]
    InvalidFeedbackTarget(usize),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl From<ProviderError> for ChatError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured(msg) => ChatError::NotConfigured(msg),
            ProviderError::RequestFailed { status, message } => {
                ChatError::RequestFailed { status, message }
            }
            ProviderError::MalformedResponse(msg) => ChatError::MalformedResponse(msg),
        }
    }
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ChatError::NotFound("record".to_string()),
            other => ChatError::PersistenceFailed(other.to_string()),
        }
    }
}

/// Errors from repository operations (used by trait definitions in persona-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::InactiveBot("cabin-42".to_string());
        assert_eq!(err.to_string(), "chatbot 'cabin-42' is not currently active");

        let err = ChatError::RequestFailed {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "request failed (HTTP 500): boom");
    }

    #[test]
    fn test_from_provider_error_keeps_kind() {
        let err: ChatError = ProviderError::NotConfigured("missing key".to_string()).into();
        assert!(matches!(err, ChatError::NotConfigured(_)));

        let err: ChatError = ProviderError::MalformedResponse("no choices".to_string()).into();
        assert!(matches!(err, ChatError::MalformedResponse(_)));

        let err: ChatError = ProviderError::RequestFailed {
            status: Some(401),
            message: "bad key".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            ChatError::RequestFailed {
                status: Some(401),
                ..
            }
        ));
    }

    #[test]
    fn test_from_repository_error() {
        let err: ChatError = RepositoryError::Query("disk full".to_string()).into();
        assert!(matches!(err, ChatError::PersistenceFailed(_)));
        assert!(err.to_string().contains("disk full"));

        let err: ChatError = RepositoryError::NotFound.into();
        assert!(matches!(err, ChatError::NotFound(_)));
    }
}
