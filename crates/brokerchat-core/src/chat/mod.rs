//! Conversation state, session management, and turn persistence abstractions.
//!
//! - [`repository::TurnRepository`] is the persistence gateway port.
//! - [`summary`] derives the session list from the flat turn log.
//! - [`session::SessionManager`] owns the active session pointer and the
//!   cached session list.
//! - [`orchestrator::ConversationOrchestrator`] is the turn-taking state
//!   machine a chat surface drives.

pub mod active;
pub mod orchestrator;
pub mod repository;
pub mod session;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;
