//! Shared domain types for the broker chat assistant.
//!
//! Conversation turns, derived session summaries, the assistant request and
//! its wire shape, user identity, configuration, and the error taxonomy used
//! across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod assistant;
pub mod config;
pub mod error;
pub mod identity;
pub mod turn;
