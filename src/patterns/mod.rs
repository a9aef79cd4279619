//! Deferred-validation patterns for strata
//!
//! A pattern is a store-side predicate that a field validator needs answered
//! but must never ask itself: validating one document may involve any number
//! of uniqueness/existence checks, and the round-trip contract is O(1) per
//! document regardless of field count.
//!
//! # Protocol
//!
//! 1. A caller-side orchestrator collects every pattern across every field
//! 2. The batch issues exactly one `multi_search`
//! 3. Each pattern interprets its own result slice
//! 4. The booleans feed back into field validators as `ExternalResults`

mod batch;

pub use batch::{ExternalResults, PatternBatch};

use serde_json::{json, Value};

use crate::store::MultiSearchItem;

/// A batchable store-side predicate keyed on a dotted path and a value.
///
/// `Exists` and `NotExists` build the identical count-style lookup; only the
/// sense of the boolean differs.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Satisfied when at least one document matches
    Exists { path: String, value: Value },
    /// Satisfied when no document matches
    NotExists { path: String, value: Value },
}

impl Pattern {
    pub fn exists(path: impl Into<String>, value: Value) -> Self {
        Pattern::Exists {
            path: path.into(),
            value,
        }
    }

    pub fn not_exists(path: impl Into<String>, value: Value) -> Self {
        Pattern::NotExists {
            path: path.into(),
            value,
        }
    }

    /// The dotted path the lookup is keyed on.
    pub fn path(&self) -> &str {
        match self {
            Pattern::Exists { path, .. } | Pattern::NotExists { path, .. } => path,
        }
    }

    /// The value the lookup is keyed on.
    pub fn value(&self) -> &Value {
        match self {
            Pattern::Exists { value, .. } | Pattern::NotExists { value, .. } => value,
        }
    }

    /// Validation type name used in `ExternalResults` keys.
    pub fn validation_type(&self) -> &'static str {
        match self {
            Pattern::Exists { .. } => "exists",
            Pattern::NotExists { .. } => "not_exists",
        }
    }

    /// Returns a copy of this pattern keyed on a different path.
    ///
    /// Used by the orchestrator to rewrite logical paths into physical form
    /// before the batch is issued.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        match self {
            Pattern::Exists { value, .. } => Pattern::exists(path, value.clone()),
            Pattern::NotExists { value, .. } => Pattern::not_exists(path, value.clone()),
        }
    }

    /// Count-style query body: a term filter with `size: 0`.
    pub fn query_body(&self) -> Value {
        json!({
            "query": { "bool": { "filter": [ { "term": { self.path(): self.value() } } ] } },
            "size": 0
        })
    }

    /// Builds the sub-query this pattern contributes to a multi-search.
    pub fn build_query(&self, index: &str, doc_type: &str) -> MultiSearchItem {
        MultiSearchItem::new(index, doc_type, self.query_body())
    }

    /// Interprets this pattern's slice of a batched response.
    ///
    /// True means the constraint is satisfied.
    pub fn validate(&self, result: &Value) -> bool {
        let total = result
            .get("hits")
            .and_then(|hits| hits.get("total"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        match self {
            Pattern::Exists { .. } => total >= 1,
            Pattern::NotExists { .. } => total == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_exists_satisfied_on_zero() {
        let pattern = Pattern::not_exists("user.email", json!("a@example.org"));
        assert!(pattern.validate(&json!({ "hits": { "total": 0 } })));
        assert!(!pattern.validate(&json!({ "hits": { "total": 1 } })));
    }

    #[test]
    fn test_exists_is_negation_on_same_inputs() {
        let pattern = Pattern::exists("user.email", json!("a@example.org"));
        assert!(!pattern.validate(&json!({ "hits": { "total": 0 } })));
        assert!(pattern.validate(&json!({ "hits": { "total": 1 } })));
        assert!(pattern.validate(&json!({ "hits": { "total": 12 } })));
    }

    #[test]
    fn test_malformed_result_counts_as_zero() {
        let pattern = Pattern::not_exists("p", json!("v"));
        assert!(pattern.validate(&json!({})));
        assert!(!Pattern::exists("p", json!("v")).validate(&json!({})));
    }

    #[test]
    fn test_query_body_is_count_style() {
        let pattern = Pattern::not_exists("tag.slug", json!("rust"));
        let body = pattern.query_body();
        assert_eq!(body["size"], 0);
        assert_eq!(
            body["query"]["bool"]["filter"][0]["term"]["tag.slug"],
            "rust"
        );
    }

    #[test]
    fn test_with_path_preserves_sense_and_value() {
        let logical = Pattern::not_exists("user.email", json!("a@example.org"));
        let physical = logical.with_path("email__v2");
        assert_eq!(physical.path(), "email__v2");
        assert_eq!(physical.value(), &json!("a@example.org"));
        assert_eq!(physical.validation_type(), "not_exists");
    }
}
