//! Projection errors
//!
//! Version resolution failures. The only local recovery anywhere in the
//! projection path is the documented fallback to version 1 when the
//! registry holds no entry for a field; everything else propagates.

use thiserror::Error;

/// Result type for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Errors raised while projecting between logical and physical form
#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    /// A target-version set binds several versions of one field and the
    /// document carries more than one of them
    #[error("field '{field}': ambiguous versions {versions:?} under the supplied target set")]
    AmbiguousField { field: String, versions: Vec<u32> },

    /// Document root (or a nested value expected to be one) is not an object
    #[error("expected a document object, got {actual}")]
    NotAnObject { actual: &'static str },

    /// A target-version identifier does not have the qualified form
    #[error("malformed target version identifier '{identifier}'")]
    MalformedTargetVersion { identifier: String },
}

impl ProjectionError {
    pub fn ambiguous(field: &str, versions: Vec<u32>) -> Self {
        ProjectionError::AmbiguousField {
            field: field.into(),
            versions,
        }
    }
}
