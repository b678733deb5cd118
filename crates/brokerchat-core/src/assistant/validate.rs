//! Shape checks run before an assistant request leaves the process.

use brokerchat_types::assistant::{AssistantRequest, HISTORY_WINDOW};
use brokerchat_types::error::AssistantError;

/// Validate an [`AssistantRequest`].
///
/// Rejects nil user/session ids, a blank email, a blank message, and history
/// that is longer than [`HISTORY_WINDOW`] or contains blank entries.
pub fn validate_request(request: &AssistantRequest) -> Result<(), AssistantError> {
    if request.user_id.is_nil() {
        return Err(AssistantError::Validation("missing userId".to_string()));
    }
    if request.user_email.trim().is_empty() {
        return Err(AssistantError::Validation("missing userEmail".to_string()));
    }
    if request.session_id.is_nil() {
        return Err(AssistantError::Validation("missing sessionId".to_string()));
    }
    if request.message.trim().is_empty() {
        return Err(AssistantError::Validation("message is empty".to_string()));
    }
    if request.history.len() > HISTORY_WINDOW {
        return Err(AssistantError::Validation(format!(
            "history has {} entries, at most {HISTORY_WINDOW} allowed",
            request.history.len()
        )));
    }
    if let Some(pos) = request
        .history
        .iter()
        .position(|entry| entry.message.trim().is_empty())
    {
        return Err(AssistantError::Validation(format!(
            "history entry {pos} has an empty message"
        )));
    }
    Ok(())
}
