use thiserror::Error;

/// Broad class of an [`AssistantError`], for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantErrorKind {
    Validation,
    Timeout,
    Transport,
    Protocol,
}

/// Errors from one assistant call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistantError {
    /// The request was malformed; nothing was sent.
    #[error("invalid assistant request: {0}")]
    Validation(String),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-2xx response from the assistant endpoint.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// The request never got a response (connection refused, DNS, TLS...).
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response that carried an error or no usable reply.
    #[error("assistant error: {0}")]
    Protocol(String),
}

impl AssistantError {
    pub fn kind(&self) -> AssistantErrorKind {
        match self {
            AssistantError::Validation(_) => AssistantErrorKind::Validation,
            AssistantError::Timeout { .. } => AssistantErrorKind::Timeout,
            AssistantError::Transport { .. } | AssistantError::Network(_) => {
                AssistantErrorKind::Transport
            }
            AssistantError::Protocol(_) => AssistantErrorKind::Protocol,
        }
    }

    /// Whether resubmitting the same message may succeed.
    ///
    /// Timeouts and network failures are transient; 5xx and 429 may be.
    pub fn is_retryable(&self) -> bool {
        match self {
            AssistantError::Timeout { .. } | AssistantError::Network(_) => true,
            AssistantError::Transport { status, .. } => *status >= 500 || *status == 429,
            AssistantError::Validation(_) | AssistantError::Protocol(_) => false,
        }
    }
}

/// Errors from the persistence gateway.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    /// A stored row could not be mapped back into a turn.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Reasons a submission is refused before anything happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("no active session")]
    NoActiveSession,

    #[error("a message is already being sent")]
    Busy,

    #[error("no failed message to retry")]
    NothingToRetry,
}

/// Errors from session-level chat operations (select, delete, resume).
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
