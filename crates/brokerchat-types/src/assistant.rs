//! Assistant request and response shapes.
//!
//! These model one chat turn sent to the external assistant workflow and the
//! JSON it answers with. Field names follow the webhook's camelCase contract.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::turn::{ConversationTurn, Sender};

/// Number of prior turns sent as history with each request.
pub const HISTORY_WINDOW: usize = 10;

/// Default deadline for one assistant call, in milliseconds.
pub const DEFAULT_ASSISTANT_TIMEOUT_MS: u64 = 30_000;

/// One prior turn as the assistant sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub message: String,
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            sender: turn.sender,
            message: turn.message.clone(),
        }
    }
}

/// CRM selection state the user had open when sending the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub selected_lender_ids: BTreeSet<Uuid>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub selected_document_ids: BTreeSet<Uuid>,
}

impl AssistantContext {
    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected_client_id.is_none()
            && self.selected_lender_ids.is_empty()
            && self.selected_document_ids.is_empty()
    }
}

/// A single chat turn addressed to the assistant. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub user_id: Uuid,
    pub user_email: String,
    pub session_id: Uuid,
    pub message: String,
    /// Most recent turns of the current session, oldest-first.
    pub history: Vec<HistoryEntry>,
    pub context: AssistantContext,
}

/// Response body of the assistant webhook.
///
/// A 2xx body is `{ "output": "..." }` on success or `{ "error": "..." }`
/// when the workflow itself failed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Take the last `window` non-blank turns, oldest-first.
///
/// Blank turns can only come from rows written by another client; they would
/// fail request validation, so they are left out of the history.
pub fn recent_history(turns: &[ConversationTurn], window: usize) -> Vec<HistoryEntry> {
    let mut history: Vec<HistoryEntry> = turns
        .iter()
        .rev()
        .filter(|t| !t.message.trim().is_empty())
        .take(window)
        .map(HistoryEntry::from)
        .collect();
    history.reverse();
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::NewTurn;

    fn turn(sender: Sender, message: &str) -> ConversationTurn {
        ConversationTurn::local(NewTurn {
            user_id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            sender,
            message: message.to_string(),
        })
    }

    #[test]
    fn test_request_wire_shape() {
        let client = Uuid::now_v7();
        let request = AssistantRequest {
            user_id: Uuid::nil(),
            user_email: "broker@example.com".to_string(),
            session_id: Uuid::nil(),
            message: "What's the rate on FHA loans?".to_string(),
            history: vec![HistoryEntry {
                sender: Sender::Assistant,
                message: "Hello".to_string(),
            }],
            context: AssistantContext {
                selected_client_id: Some(client),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["userEmail"], "broker@example.com");
        assert_eq!(json["history"][0]["sender"], "ai");
        assert_eq!(json["context"]["selectedClientId"], client.to_string());
        assert!(json["context"].get("selectedLenderIds").is_none());
    }

    #[test]
    fn test_reply_shapes() {
        let ok: AssistantReply = serde_json::from_str(r#"{"output":"FHA rates are..."}"#).unwrap();
        assert_eq!(ok.output.as_deref(), Some("FHA rates are..."));
        assert!(ok.error.is_none());

        let failed: AssistantReply = serde_json::from_str(r#"{"error":"workflow crashed"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("workflow crashed"));

        let empty: AssistantReply = serde_json::from_str("{}").unwrap();
        assert!(empty.output.is_none());
    }

    #[test]
    fn test_recent_history_bounds_and_order() {
        let turns: Vec<_> = (0..13)
            .map(|i| turn(if i % 2 == 0 { Sender::User } else { Sender::Assistant }, &format!("m{i}")))
            .collect();

        let history = recent_history(&turns, HISTORY_WINDOW);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].message, "m3");
        assert_eq!(history[9].message, "m12");

        assert_eq!(recent_history(&turns[..2], HISTORY_WINDOW).len(), 2);
        assert!(recent_history(&[], HISTORY_WINDOW).is_empty());
    }

    #[test]
    fn test_recent_history_skips_blank_turns() {
        let mut turns: Vec<_> = (0..10)
            .map(|i| turn(Sender::User, &format!("m{i}")))
            .collect();
        turns.insert(5, turn(Sender::Assistant, "  "));
        turns.push(turn(Sender::Assistant, ""));

        let history = recent_history(&turns, HISTORY_WINDOW);
        assert_eq!(history.len(), 10);
        assert!(history.iter().all(|h| !h.message.trim().is_empty()));
        assert_eq!(history[0].message, "m0");
        assert_eq!(history[9].message, "m9");
    }

    #[test]
    fn test_context_is_empty() {
        assert!(AssistantContext::default().is_empty());
        let mut ctx = AssistantContext::default();
        ctx.selected_document_ids.insert(Uuid::now_v7());
        assert!(!ctx.is_empty());
    }
}
