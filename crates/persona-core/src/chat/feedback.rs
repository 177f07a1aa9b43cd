//! Write-once per-message feedback.
//!
//! A verdict is set in three phases: validate the target, obtain a comment
//! (negative verdicts only), then apply under the session lock and persist.
//! The write-once check runs again in the apply phase, so a verdict that
//! lands while the comment prompt is open wins and the later one is
//! rejected.

use std::future::Future;

use persona_types::chat::{ChatMessage, FEEDBACK_PLACEHOLDER, Feedback, MessageRole};
use persona_types::error::ChatError;
use tracing::{debug, info};

use super::orchestrator::ConversationOrchestrator;
use super::repository::TranscriptRepository;

/// Source of the free-text comment attached to a negative verdict.
pub trait CommentPrompter: Send + Sync {
    /// Ask for a comment. `None` means the user cancelled.
    fn prompt_comment(&self) -> impl Future<Output = Option<String>> + Send;
}

/// Non-interactive prompter returning a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticComment(pub Option<String>);

impl StaticComment {
    pub fn new(comment: impl Into<String>) -> Self {
        Self(Some(comment.into()))
    }

    pub fn cancelled() -> Self {
        Self(None)
    }
}

impl CommentPrompter for StaticComment {
    fn prompt_comment(&self) -> impl Future<Output = Option<String>> + Send {
        let comment = self.0.clone();
        async move { comment }
    }
}

/// Result of [`FeedbackController::set_feedback`].
#[derive(Debug, Clone)]
pub enum FeedbackOutcome {
    /// The annotated message after the verdict was stored.
    Applied(ChatMessage),
    /// The comment prompt was dismissed; nothing changed.
    Cancelled,
}

pub struct FeedbackController;

impl FeedbackController {
    /// Attach `verdict` to the assistant message at `message_index`.
    ///
    /// `message_index` addresses the full message list, with the `system`
    /// entry at 0. Fails with `InvalidFeedbackTarget` for anything but an
    /// existing assistant message and with `AlreadyFeedback` if the message
    /// already carries a verdict; neither case mutates the session.
    pub async fn set_feedback<R, P>(
        orchestrator: &ConversationOrchestrator<R>,
        message_index: usize,
        verdict: Feedback,
        prompter: &P,
    ) -> Result<FeedbackOutcome, ChatError>
    where
        R: TranscriptRepository,
        P: CommentPrompter,
    {
        orchestrator.with_session(|session| check_target(&session.messages, message_index))?;

        let comment = match verdict {
            Feedback::Good => None,
            Feedback::Bad => match prompter.prompt_comment().await {
                None => {
                    debug!(
                        session_id = %orchestrator.session_id(),
                        message_index,
                        "Feedback comment cancelled"
                    );
                    return Ok(FeedbackOutcome::Cancelled);
                }
                Some(text) if text.trim().is_empty() => Some(FEEDBACK_PLACEHOLDER.to_string()),
                Some(text) => Some(text),
            },
        };

        let (annotated, snapshot) = orchestrator.with_session(|session| {
            check_target(&session.messages, message_index)?;
            let message = &mut session.messages[message_index];
            message.feedback = Some(verdict);
            message.feedback_comment = comment;
            let annotated = message.clone();
            session.touch();
            Ok::<_, ChatError>((annotated, session.clone()))
        })?;

        info!(
            session_id = %orchestrator.session_id(),
            message_index,
            verdict = %verdict,
            "Feedback recorded"
        );
        orchestrator.touch_activity();
        orchestrator.persist(&snapshot).await;

        Ok(FeedbackOutcome::Applied(annotated))
    }
}

fn check_target(messages: &[ChatMessage], index: usize) -> Result<(), ChatError> {
    let message = messages
        .get(index)
        .filter(|m| m.role == MessageRole::Assistant)
        .ok_or(ChatError::InvalidFeedbackTarget(index))?;
    if message.feedback.is_some() {
        return Err(ChatError::AlreadyFeedback);
    }
    Ok(())
}
