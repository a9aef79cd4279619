//! Observability subsystem for strata
//!
//! Structured logging for the mapping engine.
//!
//! # Principles
//!
//! 1. Observability is read-only; no side effects on engine execution
//! 2. Structured logs (JSON), one line per event
//! 3. Deterministic key ordering
//! 4. Synchronous, no buffering, no background threads

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(Severity::Info, event.as_str(), fields);
}
