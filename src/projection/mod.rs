//! Projection subsystem for strata
//!
//! Translates between the two faces of a document:
//!
//! - Logical: plain field names, the only form callers see
//! - Physical: version-qualified keys (`{field}__v{N}`), the only form the
//!   store holds
//!
//! Versions are never baked into application code. Reads surface the newest
//! version unless a tag pins an explicit set; writes resolve versions
//! through the field version registry.

mod engine;
mod errors;
mod key;

pub use engine::{ProjectionEngine, TargetVersions};
pub use errors::{ProjectionError, ProjectionResult};
pub use key::{PhysicalKey, QualifiedField, ID_KEY};
