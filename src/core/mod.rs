//! Core request-scoped context for strata
//!
//! # Design Principles
//!
//! - Configuration is explicit: engines and compilers receive an
//!   `EngineConfig` by reference, never process-wide globals
//! - Identity travels with the request, not with the connection
//! - Context objects are cheap to clone and scoped to one operation

mod config;
mod context;

pub use config::EngineConfig;
pub use context::{Identity, RequestContext};
