//! Pattern batching
//!
//! Collects every pattern one document needs and resolves all of them in a
//! single store round trip.

use std::collections::BTreeMap;

use crate::store::{MultiSearchItem, StoreClient, StoreResult};

use super::Pattern;

/// Pre-fetched pattern outcomes keyed `{field}.{validation_type}`.
///
/// Field validators consult this map instead of performing I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalResults {
    results: BTreeMap<String, bool>,
}

impl ExternalResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one outcome.
    pub fn insert(&mut self, key: impl Into<String>, satisfied: bool) {
        self.results.insert(key.into(), satisfied);
    }

    /// Outcome for a key; `None` when the batch never ran that check.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.results.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

struct BatchEntry {
    key: String,
    pattern: Pattern,
    index: String,
    doc_type: String,
}

/// Accumulates keyed patterns and executes them as one multi-search.
#[derive(Default)]
pub struct PatternBatch {
    entries: Vec<BatchEntry>,
}

impl PatternBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a pattern under a result key.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        index: impl Into<String>,
        doc_type: impl Into<String>,
        pattern: Pattern,
    ) {
        self.entries.push(BatchEntry {
            key: key.into(),
            pattern,
            index: index.into(),
            doc_type: doc_type.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sub-queries this batch will issue, in insertion order.
    pub fn requests(&self) -> Vec<MultiSearchItem> {
        self.entries
            .iter()
            .map(|entry| entry.pattern.build_query(&entry.index, &entry.doc_type))
            .collect()
    }

    /// Issues the batch as one `multi_search` and interprets every slice.
    ///
    /// An empty batch performs no I/O at all.
    pub fn execute(&self, client: &dyn StoreClient) -> StoreResult<ExternalResults> {
        let mut results = ExternalResults::new();
        if self.entries.is_empty() {
            return Ok(results);
        }

        let responses = client.multi_search(&self.requests())?;
        for (entry, response) in self.entries.iter().zip(responses.iter()) {
            results.insert(entry.key.clone(), entry.pattern.validate(response));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_empty_batch_no_io() {
        let store = MemoryStore::new();
        let batch = PatternBatch::new();
        let results = batch.execute(&store).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_batch_outcomes_keyed() {
        let store = MemoryStore::new();
        store.insert("app", "user", "u1", json!({ "email__v1": "taken@example.org" }));

        let mut batch = PatternBatch::new();
        batch.add(
            "email.not_exists",
            "app",
            "user",
            Pattern::not_exists("email__v1", json!("taken@example.org")),
        );
        batch.add(
            "email2.not_exists",
            "app",
            "user",
            Pattern::not_exists("email__v1", json!("free@example.org")),
        );
        batch.add(
            "owner.exists",
            "app",
            "user",
            Pattern::exists("email__v1", json!("taken@example.org")),
        );

        let results = batch.execute(&store).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.get("email.not_exists"), Some(false));
        assert_eq!(results.get("email2.not_exists"), Some(true));
        assert_eq!(results.get("owner.exists"), Some(true));
        assert_eq!(results.get("never.queued"), None);
    }

    #[test]
    fn test_requests_in_insertion_order() {
        let mut batch = PatternBatch::new();
        batch.add("a", "app", "user", Pattern::exists("x", json!(1)));
        batch.add("b", "meta", "tag", Pattern::not_exists("y", json!(2)));
        let requests = batch.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].doc_type, "user");
        assert_eq!(requests[1].index, "meta");
    }
}
