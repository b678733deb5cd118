//! In-memory state of the conversation a chat surface is showing.

use std::fmt;

use brokerchat_types::error::AssistantError;
use brokerchat_types::turn::ConversationTurn;
use uuid::Uuid;

/// Where the current submission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Sending,
    Success,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "idle"),
            TurnState::Sending => write!(f, "sending"),
            TurnState::Success => write!(f, "success"),
            TurnState::Failed => write!(f, "failed"),
        }
    }
}

/// The transcript a chat surface renders.
///
/// This is the rendering source of truth; storage is the durability source of
/// truth. A storage failure never removes anything from here.
#[derive(Debug, Clone, Default)]
pub struct ActiveSession {
    /// `None` until a session is selected or created.
    pub session_id: Option<Uuid>,
    pub turns: Vec<ConversationTurn>,
    pub state: TurnState,
    /// True while a submission is in flight; gates new submissions.
    pub is_busy: bool,
    pub last_error: Option<AssistantError>,
}

impl ActiveSession {
    /// A fresh view of `session_id` showing `turns`.
    pub fn for_session(session_id: Uuid, turns: Vec<ConversationTurn>) -> Self {
        Self {
            session_id: Some(session_id),
            turns,
            ..Default::default()
        }
    }

    /// Text of the most recent user turn, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.sender == brokerchat_types::turn::Sender::User)
            .map(|t| t.message.as_str())
    }
}
