//! Interactive CLI chat with the broker assistant.
//!
//! Drives a [`ConversationOrchestrator`](brokerchat_core::chat::orchestrator::ConversationOrchestrator)
//! from a readline prompt: spinner while a reply is pending, slash commands
//! for sessions and CRM context. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
