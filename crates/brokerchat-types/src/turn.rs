//! Conversation turn and session summary types.
//!
//! A turn is one message (user or assistant) within a conversation session.
//! Turns are append-only records; session summaries are derived from them and
//! never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who produced a turn.
///
/// The wire and storage vocabulary is `"user" | "ai"`. `"assistant"` is
/// accepted when parsing so rows written by older clients still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

impl Sender {
    /// Storage/wire form of this sender.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "ai",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "ai" | "assistant" => Ok(Sender::Assistant),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// A persisted conversation turn.
///
/// `user_id` and `session_id` never change after creation. Within a session,
/// turns are ordered by `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub sender: Sender,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Build an in-memory turn stamped now, before (or without) persistence.
    pub fn local(new: NewTurn) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            session_id: new.session_id,
            sender: new.sender,
            message: new.message,
            created_at: Utc::now(),
        }
    }
}

/// Insert payload for the persistence gateway, which assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTurn {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub sender: Sender,
    pub message: String,
}

impl From<&ConversationTurn> for NewTurn {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            user_id: turn.user_id,
            session_id: turn.session_id,
            sender: turn.sender,
            message: turn.message.clone(),
        }
    }
}

/// Latest activity of one session, derived from its most recent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub preview_message: String,
}
