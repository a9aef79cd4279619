//! Field configuration errors
//!
//! Raised at field construction time, never during value validation.
//! Value-level failures are aggregated in `ValidationReport` instead.

use thiserror::Error;

/// Result type for field construction
pub type FieldResult<T> = Result<T, ConfigurationError>;

/// Errors raised while instantiating a field from a raw attribute map
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// Attribute keys outside the kind's whitelist
    #[error("field '{field}': unknown attributes: {}", keys.join(", "))]
    UnknownAttributes { field: String, keys: Vec<String> },

    /// Type tag does not name a field kind
    #[error("field '{field}': unknown field type '{kind}'")]
    UnknownKind { field: String, kind: String },

    /// A whitelisted attribute carries an unusable value
    #[error("field '{field}': attribute '{attribute}': {reason}")]
    InvalidAttribute {
        field: String,
        attribute: String,
        reason: String,
    },

    /// Two attributes that cannot be combined
    #[error("field '{field}': {reason}")]
    ConflictingAttributes { field: String, reason: String },
}

impl ConfigurationError {
    pub fn unknown_attributes(field: &str, mut keys: Vec<String>) -> Self {
        keys.sort();
        ConfigurationError::UnknownAttributes {
            field: field.into(),
            keys,
        }
    }

    pub fn unknown_kind(field: &str, kind: &str) -> Self {
        ConfigurationError::UnknownKind {
            field: field.into(),
            kind: kind.into(),
        }
    }

    pub fn invalid_attribute(field: &str, attribute: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidAttribute {
            field: field.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn conflicting(field: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::ConflictingAttributes {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
