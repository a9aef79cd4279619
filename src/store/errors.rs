//! Store client errors
//!
//! Transport and protocol failures from the remote store. These propagate
//! to the caller unchanged; retry and backoff belong to the transport
//! layer, not here.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a store client
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("document not found: {index}/{doc_type}/{id}")]
    NotFound {
        index: String,
        doc_type: String,
        id: String,
    },

    /// Non-2xx response from the store
    #[error("store request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Shorthand for a missing-document error.
    pub fn not_found(index: &str, doc_type: &str, id: &str) -> Self {
        StoreError::NotFound {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
        }
    }

    /// True when the error means the document simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("app", "user", "u1");
        assert_eq!(format!("{}", err), "document not found: app/user/u1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_transport_not_not_found() {
        let err = StoreError::Transport {
            status: 503,
            body: "unavailable".into(),
        };
        assert!(!err.is_not_found());
    }
}
