//! SQLite storage layer.
//!
//! The local turn store: a WAL-mode database with split read/write
//! connection pools and the `TurnRepository` implementation over it.

pub mod pool;
pub mod turn;
