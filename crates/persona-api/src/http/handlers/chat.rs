//! Chat widget HTTP handlers.
//!
//! Endpoints (no authentication; a publish id is the widget's only key):
//! - POST   /api/v1/chat/{publish_id}/sessions                       - Open a session
//! - GET    /api/v1/sessions/{id}                                    - Current session view
//! - POST   /api/v1/sessions/{id}/messages                           - Send a user message
//! - POST   /api/v1/sessions/{id}/messages/{index}/feedback          - Rate an assistant message
//! - DELETE /api/v1/sessions/{id}                                    - Close a live session
//!
//! Message indexes address the full session list, whose hidden system
//! entry sits at 0, so the greeting is index 1.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use persona_core::chat::feedback::{FeedbackController, FeedbackOutcome, StaticComment};
use persona_core::chat::orchestrator::{ConversationState, IgnoreReason, SendOutcome};
use persona_types::chat::{ChatMessage, ConversationSession, Feedback, GroundingLink};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// One visible message plus its addressable index.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub index: usize,
    #[serde(flatten)]
    pub message: ChatMessage,
    /// Search result links parsed from grounding metadata.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<GroundingLink>,
}

impl MessageView {
    fn new(index: usize, message: ChatMessage) -> Self {
        let links = message
            .grounding_metadata
            .as_ref()
            .map(|g| g.links())
            .unwrap_or_default();
        Self {
            index,
            message,
            links,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub persisted_id: Option<String>,
    pub publish_id: String,
    pub bot_name: String,
    pub state: &'static str,
    pub messages: Vec<MessageView>,
}

impl SessionView {
    fn new(session: ConversationSession, state: ConversationState) -> Self {
        let messages = session
            .messages
            .into_iter()
            .enumerate()
            .filter(|(_, m)| !m.is_system())
            .map(|(i, m)| MessageView::new(i, m))
            .collect();
        Self {
            session_id: session.session_id,
            persisted_id: session.persisted_id,
            publish_id: session.publish_id,
            bot_name: session.bot_name,
            state: match state {
                ConversationState::Idle => "idle",
                ConversationState::Sending => "sending",
            },
            messages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageView {
    /// `replied`, `failed`, or `ignored`.
    pub outcome: &'static str,
    /// Why an `ignored` send was dropped (`empty` or `busy`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageView>,
    pub session: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub verdict: Feedback,
    /// Only read for `bad`; missing or blank stores a placeholder.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// POST /api/v1/chat/{publish_id}/sessions - Open a session with a published bot.
pub async fn open_session(
    State(state): State<AppState>,
    Path(publish_id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();

    let live = state.chat_service.open_session(&publish_id).await?;
    let view = SessionView::new(live.session(), live.state());
    let href = format!("/api/v1/sessions/{}", view.session_id);

    Ok(Json(
        ApiResponse::success(view, start)
            .with_link("self", &href)
            .with_link("messages", &format!("{href}/messages")),
    ))
}

/// GET /api/v1/sessions/{id} - Current state of a live session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let start = Instant::now();
    let live = state.chat_service.require(&parse_uuid(&session_id)?)?;
    let view = SessionView::new(live.session(), live.state());
    Ok(Json(ApiResponse::success(view, start)))
}

/// POST /api/v1/sessions/{id}/messages - Send a user message and wait for the reply.
///
/// Provider failures are not HTTP errors: they come back as an `is_error`
/// assistant message with outcome `failed`.
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<SendMessageView>>, AppError> {
    let start = Instant::now();
    let live = state.chat_service.require(&parse_uuid(&session_id)?)?;

    let outcome = live.send_user_message(&body.text).await;
    let session = live.session();

    let message = outcome.message().and_then(|reply| {
        session
            .messages
            .iter()
            .rposition(|m| m == reply)
            .map(|i| MessageView::new(i, reply.clone()))
    });
    let (outcome, reason) = match outcome {
        SendOutcome::Replied(_) => ("replied", None),
        SendOutcome::Failed(_) => ("failed", None),
        SendOutcome::Ignored(IgnoreReason::Empty) => ("ignored", Some("empty")),
        SendOutcome::Ignored(IgnoreReason::Busy) => ("ignored", Some("busy")),
        SendOutcome::Ignored(IgnoreReason::Closed) => ("ignored", Some("closed")),
    };

    let view = SendMessageView {
        outcome,
        reason,
        message,
        session: SessionView::new(session, live.state()),
    };
    Ok(Json(ApiResponse::success(view, start)))
}

/// POST /api/v1/sessions/{id}/messages/{index}/feedback - Rate an assistant message once.
pub async fn set_feedback(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<MessageView>>, AppError> {
    let start = Instant::now();
    let live = state.chat_service.require(&parse_uuid(&session_id)?)?;

    // The widget collects the comment before posting, so the prompt never cancels.
    let prompter = StaticComment(Some(body.comment.unwrap_or_default()));
    match FeedbackController::set_feedback(&*live, index, body.verdict, &prompter).await? {
        FeedbackOutcome::Applied(message) => Ok(Json(ApiResponse::success(
            MessageView::new(index, message),
            start,
        ))),
        FeedbackOutcome::Cancelled => Err(AppError::Validation(
            "Feedback comment was cancelled".to_string(),
        )),
    }
}

/// DELETE /api/v1/sessions/{id} - Close a live session. Its transcript is kept.
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let id = parse_uuid(&session_id)?;
    if !state.chat_service.close(&id) {
        return Err(persona_types::error::ChatError::NotFound(format!("session '{id}'")).into());
    }
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "closed": true, "session_id": id }),
        start,
    )))
}
