//! Query payload errors

use thiserror::Error;

/// Result type for query building
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while parsing a search payload
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Payload is not structurally a search request
    #[error("invalid search payload: {0}")]
    InvalidPayload(String),
}
