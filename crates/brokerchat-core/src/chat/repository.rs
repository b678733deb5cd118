//! TurnRepository trait definition.
//!
//! The persistence gateway for conversation turns. Every operation is scoped
//! to a `user_id`; implementations must never return or delete another
//! user's rows.

use brokerchat_types::error::StorageError;
use brokerchat_types::turn::{ConversationTurn, NewTurn};
use uuid::Uuid;

/// Repository trait for append-only conversation turn storage.
///
/// Implementations live in brokerchat-infra (e.g., `SqliteTurnRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TurnRepository: Send + Sync {
    /// Persist a new turn, assigning its `id` and `created_at`.
    fn insert_turn(
        &self,
        turn: &NewTurn,
    ) -> impl std::future::Future<Output = Result<ConversationTurn, StorageError>> + Send;

    /// Get one session's turns, ordered by created_at ASC.
    fn fetch_turns(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;

    /// Get every turn the user owns across all sessions.
    fn fetch_user_turns(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;

    /// Delete all turns of one session, returning how many rows went away.
    fn delete_session_turns(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;
}
