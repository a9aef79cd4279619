//! Structured query builder for strata
//!
//! Translates a generic search payload into the store's native
//! filtered/bool query form. The payload is deliberately small: free-text
//! query, must/should filters, exclusions, sort and counter aggregations.
//! Anything richer belongs to the caller speaking the store's language
//! directly.

mod builder;
mod errors;
mod payload;

pub use builder::{build_query, BOOST_FIELDS};
pub use errors::{QueryError, QueryResult};
pub use payload::{Filters, GroupByCounter, QueryInput, SearchPayload};
