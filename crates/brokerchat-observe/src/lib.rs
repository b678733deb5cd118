//! Observability for the broker chat assistant.
//!
//! Installs the global `tracing` subscriber: human-readable or JSON logs on
//! stderr, with optional OpenTelemetry span export.

pub mod tracing_setup;
