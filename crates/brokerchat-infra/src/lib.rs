//! Infrastructure layer for the broker chat assistant.
//!
//! Contains implementations of the port traits defined in `brokerchat-core`:
//! the SQLite turn store, the n8n webhook assistant transport, and the
//! `config.toml` loader.

pub mod assistant;
pub mod config;
pub mod sqlite;
