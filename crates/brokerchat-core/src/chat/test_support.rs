//! In-memory ports shared by the chat module tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use brokerchat_types::assistant::AssistantRequest;
use brokerchat_types::error::{AssistantError, StorageError};
use brokerchat_types::turn::{ConversationTurn, NewTurn};
use chrono::Utc;
use tokio::sync::{Notify, oneshot};
use uuid::Uuid;

use crate::assistant::transport::AssistantTransport;
use crate::assistant::validate::validate_request;
use crate::chat::repository::TurnRepository;

// --- Turn repository ---

#[derive(Default)]
pub struct MemoryTurnRepository {
    rows: Mutex<Vec<ConversationTurn>>,
    pub fail_inserts: AtomicBool,
    /// Fail only the Nth insert (1-based); 0 disables.
    pub fail_insert_at: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fetch_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    insert_gate: Mutex<Option<(usize, oneshot::Receiver<()>)>>,
    /// Signalled after every stored row.
    pub inserted: Notify,
}

impl MemoryTurnRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a row directly, bypassing failure switches.
    pub fn seed(&self, turn: ConversationTurn) {
        self.rows.lock().unwrap().push(turn);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Hold the Nth insert (1-based) until the returned sender fires.
    pub fn gate_insert(&self, nth: usize) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.insert_gate.lock().unwrap() = Some((nth, rx));
        tx
    }
}

impl TurnRepository for MemoryTurnRepository {
    async fn insert_turn(&self, turn: &NewTurn) -> Result<ConversationTurn, StorageError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = {
            let mut gate = self.insert_gate.lock().unwrap();
            if gate.as_ref().is_some_and(|(nth, _)| *nth == call) {
                gate.take().map(|(_, rx)| rx)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.fail_inserts.load(Ordering::SeqCst)
            || self.fail_insert_at.load(Ordering::SeqCst) == call
        {
            return Err(StorageError::Connection);
        }
        let stored = ConversationTurn {
            id: Uuid::now_v7(),
            user_id: turn.user_id,
            session_id: turn.session_id,
            sender: turn.sender,
            message: turn.message.clone(),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(stored.clone());
        self.inserted.notify_one();
        Ok(stored)
    }

    async fn fetch_turns(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Query("read failed".to_string()));
        }
        let mut turns: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == *user_id && t.session_id == *session_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.created_at);
        Ok(turns)
    }

    async fn fetch_user_turns(&self, user_id: &Uuid) -> Result<Vec<ConversationTurn>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Query("read failed".to_string()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn delete_session_turns(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<u64, StorageError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| !(t.user_id == *user_id && t.session_id == *session_id));
        Ok((before - rows.len()) as u64)
    }
}

// --- Assistant transport ---

pub enum Scripted {
    Reply(String),
    Fail(AssistantError),
    /// Never answers; the deadline decides.
    Hang,
}

/// Transport that answers from a script and records every request.
///
/// With no script left it echoes the message back.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    pub requests: Mutex<Vec<AssistantRequest>>,
    /// Signalled when `send` is entered.
    pub started: Notify,
    /// When set, `send` waits for this before answering.
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockTransport {
    pub fn scripted(items: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(items.into()),
            ..Default::default()
        }
    }

    /// Hold the next `send` until the returned sender fires.
    pub fn gated(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> AssistantRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl AssistantTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(
        &self,
        request: &AssistantRequest,
        timeout: Duration,
    ) -> Result<String, AssistantError> {
        validate_request(request)?;
        self.requests.lock().unwrap().push(request.clone());
        self.started.notify_one();

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => {
                let hang = std::future::pending::<()>();
                let _ = tokio::time::timeout(timeout, hang).await;
                Err(AssistantError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            None => Ok(format!("echo: {}", request.message)),
        }
    }
}
