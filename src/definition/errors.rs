//! Definition compiler errors
//!
//! Structural failures only. Per-field problems (bad configuration,
//! unresolved link targets) are recorded in the compile report so a caller
//! reviews a whole schema's issues at once; they never abort compilation.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for definition compilation
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Errors that abort a compile outright
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Raw schema is not a JSON object
    #[error("raw schema must be an object, got {actual}")]
    SchemaNotAnObject { actual: &'static str },

    /// Schema declares no fields at all
    #[error("raw schema for '{doc_type}' declares no fields")]
    NoFields { doc_type: String },

    /// The `_meta` block is structurally invalid
    #[error("malformed _meta block: {0}")]
    MalformedMeta(String),

    /// Store failure during the resolve phase
    #[error(transparent)]
    Store(#[from] StoreError),
}
