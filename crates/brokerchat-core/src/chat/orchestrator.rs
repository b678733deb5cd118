//! Conversation orchestrator: the turn-taking state machine behind a chat
//! surface.
//!
//! A submission moves `Idle -> Sending -> Success | Failed`:
//! 1. The user turn is appended to the in-memory transcript immediately.
//! 2. The assistant is called with the last [`HISTORY_WINDOW`] prior turns.
//! 3. On a reply, the assistant turn is appended, both turns are persisted
//!    (user first), and the cached session list is patched.
//! 4. On an error, it is recorded on the session and the user turn stays.
//!
//! Persistence failures after a reply are logged and swallowed. The
//! in-memory transcript keeps both turns either way.
//!
//! If the user switches sessions while a send is in flight, that send still
//! completes and persists against the session it was sent from. Its reply is
//! only appended to the transcript if that session is active again by then.
//! New submissions stay blocked until it resolves. Until both turns are
//! stored, loading that session from storage merges in whatever the store
//! does not have yet.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use brokerchat_types::assistant::{
    AssistantContext, AssistantRequest, DEFAULT_ASSISTANT_TIMEOUT_MS, HISTORY_WINDOW,
    recent_history,
};
use brokerchat_types::error::{AssistantError, ChatError, StorageError, SubmitError};
use brokerchat_types::identity::UserIdentity;
use brokerchat_types::turn::{ConversationTurn, NewTurn, Sender, SessionSummary};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::assistant::transport::AssistantTransport;

use super::active::{ActiveSession, TurnState};
use super::repository::TurnRepository;
use super::session::{Resumption, Selection, SessionManager};

/// What happened to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant answered. `persisted_turns` is how many of the two turns
    /// reached storage (0, 1, or 2).
    Replied { reply: String, persisted_turns: u8 },
    /// The assistant call failed; the error is also on `last_error`.
    Failed(AssistantError),
}

/// Turns of the send in flight that may not be in storage yet.
#[derive(Debug, Clone)]
struct InFlight {
    session_id: Uuid,
    /// Truncated to the store's timestamp precision.
    started_at: DateTime<Utc>,
    /// The user turn, then the assistant turn once the reply is in.
    turns: Vec<ConversationTurn>,
}

impl InFlight {
    fn new(user_turn: &ConversationTurn) -> Self {
        Self {
            session_id: user_turn.session_id,
            started_at: user_turn.created_at.trunc_subsecs(6),
            turns: vec![user_turn.clone()],
        }
    }

    /// Add the pending turns `transcript` lacks, keeping user before
    /// assistant.
    fn merge_into(&self, transcript: &mut Vec<ConversationTurn>) {
        let mut anchor = transcript.len();
        for turn in self.turns.iter().rev() {
            match transcript[..anchor]
                .iter()
                .rposition(|t| self.is_copy_of(t, turn))
            {
                Some(index) => anchor = index,
                None => transcript.insert(anchor, turn.clone()),
            }
        }
    }

    /// `candidate` is `turn` itself, or the row the store made from it. Stored
    /// rows get their own id, so those match on content written since the
    /// send began.
    fn is_copy_of(&self, candidate: &ConversationTurn, turn: &ConversationTurn) -> bool {
        candidate.id == turn.id
            || (candidate.session_id == turn.session_id
                && candidate.sender == turn.sender
                && candidate.message == turn.message
                && candidate.created_at >= self.started_at)
    }
}

/// Drives one chat surface: owns its [`ActiveSession`] and its
/// [`SessionManager`].
///
/// Methods take `&self`; state sits behind a mutex that is never held across
/// an `.await`, so a session switch can run while a submission is in flight.
pub struct ConversationOrchestrator<T: AssistantTransport, R: TurnRepository> {
    transport: T,
    repo: Arc<R>,
    sessions: SessionManager<R>,
    identity: UserIdentity,
    timeout: Duration,
    state: Mutex<ActiveSession>,
    /// Locked after `state` when both are needed.
    in_flight: Mutex<Option<InFlight>>,
}

impl<T: AssistantTransport, R: TurnRepository> ConversationOrchestrator<T, R> {
    /// Create an orchestrator for `identity` with the default 30 s timeout.
    pub fn new(transport: T, repo: Arc<R>, identity: UserIdentity) -> Self {
        Self {
            transport,
            sessions: SessionManager::new(Arc::clone(&repo)),
            repo,
            identity,
            timeout: Duration::from_millis(DEFAULT_ASSISTANT_TIMEOUT_MS),
            state: Mutex::new(ActiveSession::default()),
            in_flight: Mutex::new(None),
        }
    }

    /// Override the assistant call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Access the session manager.
    pub fn session_manager(&self) -> &SessionManager<R> {
        &self.sessions
    }

    /// A copy of the current transcript and status, for rendering.
    pub fn snapshot(&self) -> ActiveSession {
        self.lock_state().clone()
    }

    /// Cached session list, newest first.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.sessions.cached_sessions()
    }

    /// Re-fetch the session list from storage.
    pub async fn refresh_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        self.sessions.list_sessions(&self.identity.user_id).await
    }

    // --- Session lifecycle ---

    /// Open the chat surface on the most recent session, creating one if the
    /// user has none.
    pub async fn open(&self) -> Result<Uuid, ChatError> {
        let resumption = self.sessions.resume_or_create(&self.identity.user_id).await?;
        let session_id = resumption.session_id();
        match resumption {
            Resumption::Created(_) => self.show_session(session_id, Vec::new()),
            Resumption::Resumed { selection, .. } => {
                if let Selection::Loaded(turns) = selection {
                    self.show_session(session_id, turns);
                }
            }
        }
        Ok(session_id)
    }

    /// Start an empty conversation under a fresh session id.
    pub fn new_conversation(&self) -> Uuid {
        let session_id = self.sessions.start_new_session();
        self.show_session(session_id, Vec::new());
        session_id
    }

    /// Switch to an existing session. Re-selecting the active session does
    /// nothing.
    pub async fn select_session(&self, session_id: Uuid) -> Result<(), ChatError> {
        let selection = self
            .sessions
            .select_session(&self.identity.user_id, session_id)
            .await?;
        if let Selection::Loaded(turns) = selection {
            self.show_session(session_id, turns);
        }
        Ok(())
    }

    /// Delete a session. When it was the active one, the most recent
    /// remaining session becomes active, or a new one is created.
    ///
    /// Returns the session that is active afterwards.
    pub async fn delete_session(&self, session_id: Uuid) -> Result<Uuid, ChatError> {
        let deletion = self
            .sessions
            .delete_session(session_id, &self.identity.user_id)
            .await?;

        let shown = self.lock_state().session_id;
        if !deletion.was_active && shown != Some(session_id) {
            return Ok(match shown {
                Some(id) => id,
                None => self.new_conversation(),
            });
        }

        if let Some(next) = self.sessions.cached_sessions().first() {
            let next_id = next.session_id;
            match self.select_session(next_id).await {
                Ok(()) => return Ok(next_id),
                Err(err) => {
                    warn!(session_id = %next_id, error = %err, "Could not load next session, starting a new one");
                }
            }
        }
        Ok(self.new_conversation())
    }

    // --- Turn taking ---

    /// Send a user message to the assistant.
    ///
    /// Returns `Err` only when the submission is refused outright (blank
    /// text, no active session, or a send already in flight); nothing changes
    /// and no request is made in that case. Assistant failures come back as
    /// [`TurnOutcome::Failed`] and are recorded on the active session.
    pub async fn submit(
        &self,
        text: &str,
        context: AssistantContext,
    ) -> Result<TurnOutcome, SubmitError> {
        let (request, user_turn) = self.begin_turn(text, context)?;
        let session_id = request.session_id;

        let span = info_span!(
            "assistant.send",
            assistant.transport = self.transport.name(),
            chat.session_id = %session_id,
            assistant.history_len = request.history.len(),
            assistant.timeout_ms = self.timeout.as_millis() as u64,
        );
        let result = self
            .transport
            .send(&request, self.timeout)
            .instrument(span)
            .await;

        match result {
            Ok(reply) => Ok(self.complete_turn(user_turn, reply).await),
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Assistant call failed");
                let mut state = self.lock_state();
                if state.session_id == Some(session_id) {
                    state.state = TurnState::Failed;
                    state.last_error = Some(err.clone());
                }
                *self.lock_in_flight() = None;
                state.is_busy = false;
                Ok(TurnOutcome::Failed(err))
            }
        }
    }

    /// Resubmit the last user message after a failed send.
    ///
    /// The failed user turn stays in the transcript; the retry appends a new
    /// one, the same as the user typing the message again.
    pub async fn retry_last(&self, context: AssistantContext) -> Result<TurnOutcome, SubmitError> {
        let text = {
            let state = self.lock_state();
            if state.state != TurnState::Failed {
                return Err(SubmitError::NothingToRetry);
            }
            state
                .last_user_message()
                .map(str::to_string)
                .ok_or(SubmitError::NothingToRetry)?
        };
        self.submit(&text, context).await
    }

    /// Validate the submission, append the optimistic user turn, and build
    /// the request from the turns that preceded it.
    fn begin_turn(
        &self,
        text: &str,
        context: AssistantContext,
    ) -> Result<(AssistantRequest, ConversationTurn), SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }

        let mut state = self.lock_state();
        let session_id = state.session_id.ok_or(SubmitError::NoActiveSession)?;
        if state.is_busy {
            return Err(SubmitError::Busy);
        }

        let history = recent_history(&state.turns, HISTORY_WINDOW);
        let user_turn = ConversationTurn::local(NewTurn {
            user_id: self.identity.user_id,
            session_id,
            sender: Sender::User,
            message: text.to_string(),
        });

        state.turns.push(user_turn.clone());
        *self.lock_in_flight() = Some(InFlight::new(&user_turn));
        state.last_error = None;
        state.is_busy = true;
        state.state = TurnState::Sending;

        let request = AssistantRequest {
            user_id: self.identity.user_id,
            user_email: self.identity.email.clone(),
            session_id,
            message: text.to_string(),
            history,
            context,
        };
        Ok((request, user_turn))
    }

    async fn complete_turn(&self, user_turn: ConversationTurn, reply: String) -> TurnOutcome {
        let session_id = user_turn.session_id;
        let assistant_turn = ConversationTurn::local(NewTurn {
            user_id: self.identity.user_id,
            session_id,
            sender: Sender::Assistant,
            message: reply.clone(),
        });

        {
            let mut state = self.lock_state();
            let mut in_flight = self.lock_in_flight();
            if let Some(pending) = in_flight.as_mut() {
                pending.turns.push(assistant_turn.clone());
                if state.session_id == Some(session_id) {
                    pending.merge_into(&mut state.turns);
                    state.state = TurnState::Success;
                }
            }
        }

        let persisted_turns = self.persist_pair(&user_turn, &assistant_turn).await;

        self.sessions.record_activity(SessionSummary {
            session_id,
            last_message_at: Utc::now(),
            preview_message: reply.clone(),
        });

        {
            let mut state = self.lock_state();
            // The session may have been loaded from storage between the two
            // inserts.
            if let Some(pending) = self.lock_in_flight().take() {
                if state.session_id == Some(pending.session_id) {
                    pending.merge_into(&mut state.turns);
                }
            }
            state.is_busy = false;
        }
        info!(session_id = %session_id, persisted_turns, "Assistant replied");

        TurnOutcome::Replied {
            reply,
            persisted_turns,
        }
    }

    /// Store the user turn, then the assistant turn. Each write is
    /// independent; failures are logged and not retried.
    async fn persist_pair(&self, user_turn: &ConversationTurn, assistant_turn: &ConversationTurn) -> u8 {
        let mut persisted = 0;
        for turn in [user_turn, assistant_turn] {
            match self.repo.insert_turn(&NewTurn::from(turn)).await {
                Ok(_) => persisted += 1,
                Err(err) => {
                    warn!(
                        session_id = %turn.session_id,
                        sender = %turn.sender,
                        error = %err,
                        "Failed to persist turn; continuing"
                    );
                }
            }
        }
        persisted
    }

    /// Replace the transcript with `turns` for `session_id`. A send in flight
    /// keeps the surface busy across the switch, and its turns are merged in
    /// when it belongs to `session_id`.
    fn show_session(&self, session_id: Uuid, mut turns: Vec<ConversationTurn>) {
        let mut state = self.lock_state();
        if let Some(pending) = self.lock_in_flight().as_ref() {
            if pending.session_id == session_id {
                pending.merge_into(&mut turns);
            }
        }
        let busy = state.is_busy;
        *state = ActiveSession::for_session(session_id, turns);
        state.is_busy = busy;
    }

    fn lock_state(&self) -> MutexGuard<'_, ActiveSession> {
        self.state.lock().expect("active session lock poisoned")
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().expect("in-flight lock poisoned")
    }
}
