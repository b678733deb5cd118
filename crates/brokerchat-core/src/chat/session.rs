//! Session manager for chat sessions.
//!
//! Owns the active session pointer and the cached session list. A session
//! has no row of its own: it exists once its first turn is stored, but a
//! freshly created id is usable immediately.

use std::sync::{Arc, Mutex};

use brokerchat_types::error::StorageError;
use brokerchat_types::turn::{ConversationTurn, SessionSummary};
use tracing::{debug, info};
use uuid::Uuid;

use super::repository::TurnRepository;
use super::summary::{derive_summaries, upsert_summary};

/// Result of [`SessionManager::select_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The session was already active; nothing was fetched.
    Unchanged,
    /// The session is now active with these turns, oldest first.
    Loaded(Vec<ConversationTurn>),
}

/// Result of [`SessionManager::resume_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resumption {
    /// The user had no sessions; a new empty one is active.
    Created(Uuid),
    /// The most recent existing session is active.
    Resumed { session_id: Uuid, selection: Selection },
}

impl Resumption {
    pub fn session_id(&self) -> Uuid {
        match self {
            Resumption::Created(id) => *id,
            Resumption::Resumed { session_id, .. } => *session_id,
        }
    }
}

/// Result of [`SessionManager::delete_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deletion {
    pub deleted_turns: u64,
    /// The deleted session was the active one; the pointer is now cleared and
    /// the caller must select or create another session.
    pub was_active: bool,
}

/// Manages the active session pointer and the session list for one user.
pub struct SessionManager<R: TurnRepository> {
    repo: Arc<R>,
    active: Mutex<Option<Uuid>>,
    summaries: Mutex<Vec<SessionSummary>>,
}

impl<R: TurnRepository> SessionManager<R> {
    /// Create a session manager over the given turn repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            active: Mutex::new(None),
            summaries: Mutex::new(Vec::new()),
        }
    }

    pub fn active_session_id(&self) -> Option<Uuid> {
        *self.active.lock().expect("session pointer lock poisoned")
    }

    /// The last fetched session list, patched with turns appended since.
    pub fn cached_sessions(&self) -> Vec<SessionSummary> {
        self.summaries
            .lock()
            .expect("session list lock poisoned")
            .clone()
    }

    /// Fetch the user's sessions, newest first, and refresh the cache.
    pub async fn list_sessions(&self, user_id: &Uuid) -> Result<Vec<SessionSummary>, StorageError> {
        let turns = self.repo.fetch_user_turns(user_id).await?;
        let summaries = derive_summaries(&turns);
        debug!(user_id = %user_id, sessions = summaries.len(), "Session list fetched");

        *self.summaries.lock().expect("session list lock poisoned") = summaries.clone();
        Ok(summaries)
    }

    /// Generate a fresh session id. Nothing is written to storage.
    pub fn create_session(&self) -> Uuid {
        Uuid::now_v7()
    }

    /// Create a session id and make it active.
    pub fn start_new_session(&self) -> Uuid {
        let session_id = self.create_session();
        self.set_active(Some(session_id));
        info!(session_id = %session_id, "New session started");
        session_id
    }

    /// Make `session_id` active and fetch its turns.
    ///
    /// Selecting the already-active session is a no-op: no fetch, no reset.
    /// On a storage error the active pointer is left unchanged.
    pub async fn select_session(
        &self,
        user_id: &Uuid,
        session_id: Uuid,
    ) -> Result<Selection, StorageError> {
        if self.active_session_id() == Some(session_id) {
            debug!(session_id = %session_id, "Session already active");
            return Ok(Selection::Unchanged);
        }

        let turns = self.repo.fetch_turns(user_id, &session_id).await?;
        self.set_active(Some(session_id));
        info!(session_id = %session_id, turns = turns.len(), "Session selected");
        Ok(Selection::Loaded(turns))
    }

    /// Delete every turn of a session and drop it from the cached list.
    pub async fn delete_session(
        &self,
        session_id: Uuid,
        user_id: &Uuid,
    ) -> Result<Deletion, StorageError> {
        let deleted_turns = self.repo.delete_session_turns(user_id, &session_id).await?;

        self.summaries
            .lock()
            .expect("session list lock poisoned")
            .retain(|s| s.session_id != session_id);

        let was_active = {
            let mut active = self.active.lock().expect("session pointer lock poisoned");
            if *active == Some(session_id) {
                *active = None;
                true
            } else {
                false
            }
        };

        info!(session_id = %session_id, deleted_turns, was_active, "Session deleted");
        Ok(Deletion {
            deleted_turns,
            was_active,
        })
    }

    /// Activate the user's most recent session, or create one if they have
    /// none, so a chat surface always has a session to write into.
    pub async fn resume_or_create(&self, user_id: &Uuid) -> Result<Resumption, StorageError> {
        let sessions = self.list_sessions(user_id).await?;
        match sessions.first() {
            Some(latest) => {
                let session_id = latest.session_id;
                let selection = self.select_session(user_id, session_id).await?;
                Ok(Resumption::Resumed {
                    session_id,
                    selection,
                })
            }
            None => Ok(Resumption::Created(self.start_new_session())),
        }
    }

    /// Patch the cached list after a turn was appended to a session.
    pub fn record_activity(&self, summary: SessionSummary) {
        let mut summaries = self.summaries.lock().expect("session list lock poisoned");
        upsert_summary(&mut summaries, summary);
    }

    fn set_active(&self, session_id: Option<Uuid>) {
        *self.active.lock().expect("session pointer lock poisoned") = session_id;
    }
}
