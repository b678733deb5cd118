//! Business logic and port trait definitions for the broker chat assistant.
//!
//! This crate defines the "ports" (`TurnRepository`, `AssistantTransport`)
//! that the infrastructure layer implements, plus the session manager and
//! conversation orchestrator built on top of them. It depends only on
//! `brokerchat-types` -- never on `brokerchat-infra` or any database/IO crate.

pub mod assistant;
pub mod chat;
