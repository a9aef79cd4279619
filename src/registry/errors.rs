//! Registry errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while resolving or persisting field versions
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The caller's identity may not resolve this tag
    #[error("tag '{slug}' is not visible to the caller")]
    TagNotVisible { slug: String },

    /// Tag bound to a different document type than requested
    #[error("tag '{slug}' binds document type '{actual}', not '{expected}'")]
    WrongDocType {
        slug: String,
        expected: String,
        actual: String,
    },

    /// A binding lists more than one version of the same field, so a write
    /// cannot choose a physical key
    #[error("binding resolves field '{field}' to more than one version")]
    AmbiguousBinding { field: String },

    /// A binding pins a field version the registry holds no active record
    /// for; surfaced rather than silently defaulted
    #[error("binding pins '{identifier}' but no active registration exists")]
    MissingVersion { identifier: String },

    /// A persisted record could not be decoded
    #[error("malformed field version record: {0}")]
    MalformedRecord(String),

    /// Store failure while loading or persisting
    #[error(transparent)]
    Store(#[from] StoreError),
}
