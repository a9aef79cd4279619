//! In-memory store
//!
//! A `StoreClient` backed by process-local maps. Used by the test suites
//! and by local provisioning; implements the subset of the native query
//! language the engine actually emits (term, terms, range, bool, match_all).
//!
//! Writes become visible to searches only after `refresh`, mirroring the
//! eventual consistency of the real store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;

use super::client::{BulkAck, BulkOp, MultiSearchItem, SearchResponse, StoreClient};
use super::errors::{StoreError, StoreResult};

/// Default number of hits returned when the query carries no `size`.
const DEFAULT_SIZE: usize = 10;

type DocKey = (String, String, String);

#[derive(Default)]
struct Shelves {
    /// Documents visible to `get`
    docs: BTreeMap<DocKey, Value>,
    /// Documents visible to `search`; synced from `docs` on `refresh`
    searchable: BTreeMap<DocKey, Value>,
}

/// Process-local store double.
#[derive(Default)]
pub struct MemoryStore {
    shelves: RwLock<Shelves>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document and makes it immediately searchable.
    ///
    /// Test convenience; production writes go through `bulk_write` +
    /// `refresh`.
    pub fn insert(&self, index: &str, doc_type: &str, id: &str, body: Value) {
        let key = (index.into(), doc_type.into(), id.into());
        let mut shelves = self.shelves.write().unwrap();
        shelves.docs.insert(key.clone(), body.clone());
        shelves.searchable.insert(key, body);
    }

    /// Number of stored documents across all indexes.
    pub fn len(&self) -> usize {
        self.shelves.read().unwrap().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn run_query(
        shelves: &Shelves,
        index: &str,
        doc_type: &str,
        query: &Value,
    ) -> (u64, Vec<Value>) {
        let clause = query.get("query").unwrap_or(query);
        let size = query
            .get("size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .unwrap_or(DEFAULT_SIZE);

        let mut hits = Vec::new();
        let mut total = 0u64;
        for ((i, t, id), body) in &shelves.searchable {
            if i != index || t != doc_type {
                continue;
            }
            if matches_clause(body, clause) {
                total += 1;
                if hits.len() < size {
                    hits.push(serde_json::json!({ "_id": id, "_source": body }));
                }
            }
        }
        (total, hits)
    }

    fn envelope(total: u64, hits: Vec<Value>) -> Value {
        serde_json::json!({ "hits": { "total": total, "hits": hits } })
    }
}

impl StoreClient for MemoryStore {
    fn get(&self, index: &str, doc_type: &str, id: &str) -> StoreResult<Value> {
        let shelves = self.shelves.read().unwrap();
        shelves
            .docs
            .get(&(index.into(), doc_type.into(), id.into()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(index, doc_type, id))
    }

    fn search(&self, index: &str, doc_type: &str, query: &Value) -> StoreResult<SearchResponse> {
        let shelves = self.shelves.read().unwrap();
        let (total, hits) = Self::run_query(&shelves, index, doc_type, query);
        SearchResponse::from_value(&Self::envelope(total, hits))
    }

    fn multi_search(&self, items: &[MultiSearchItem]) -> StoreResult<Vec<Value>> {
        let shelves = self.shelves.read().unwrap();
        Ok(items
            .iter()
            .map(|item| {
                let (total, hits) = Self::run_query(&shelves, &item.index, &item.doc_type, &item.query);
                Self::envelope(total, hits)
            })
            .collect())
    }

    fn bulk_write(&self, ops: &[BulkOp]) -> StoreResult<Vec<BulkAck>> {
        let mut shelves = self.shelves.write().unwrap();
        let mut acks = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                BulkOp::Create {
                    index,
                    doc_type,
                    id,
                    body,
                } => {
                    let key = (index.clone(), doc_type.clone(), id.clone());
                    let created = !shelves.docs.contains_key(&key);
                    if created {
                        shelves.docs.insert(key, body.clone());
                    }
                    acks.push(BulkAck {
                        id: id.clone(),
                        created,
                    });
                }
                BulkOp::Update {
                    index,
                    doc_type,
                    id,
                    body,
                } => {
                    let key = (index.clone(), doc_type.clone(), id.clone());
                    let created = !shelves.docs.contains_key(&key);
                    shelves.docs.insert(key, body.clone());
                    acks.push(BulkAck {
                        id: id.clone(),
                        created,
                    });
                }
            }
        }
        Ok(acks)
    }

    fn refresh(&self, index: &str) -> StoreResult<()> {
        let mut shelves = self.shelves.write().unwrap();
        let synced: Vec<(DocKey, Value)> = shelves
            .docs
            .iter()
            .filter(|((i, _, _), _)| i == index)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, body) in synced {
            shelves.searchable.insert(key, body);
        }
        Ok(())
    }
}

/// Evaluates one query clause against a document.
fn matches_clause(doc: &Value, clause: &Value) -> bool {
    let Some(obj) = clause.as_object() else {
        return false;
    };

    if obj.contains_key("match_all") {
        return true;
    }

    if let Some(term) = obj.get("term").and_then(Value::as_object) {
        return term
            .iter()
            .all(|(path, expected)| field_matches(doc, path, expected));
    }

    if let Some(terms) = obj.get("terms").and_then(Value::as_object) {
        return terms.iter().all(|(path, expected)| {
            expected
                .as_array()
                .map(|arr| arr.iter().any(|v| field_matches(doc, path, v)))
                .unwrap_or(false)
        });
    }

    if let Some(range) = obj.get("range").and_then(Value::as_object) {
        return range.iter().all(|(path, bounds)| range_matches(doc, path, bounds));
    }

    if let Some(bool_clause) = obj.get("bool").and_then(Value::as_object) {
        let all_of = |key: &str| {
            clause_list(bool_clause.get(key))
                .iter()
                .all(|c| matches_clause(doc, c))
        };
        let none_of = |key: &str| {
            clause_list(bool_clause.get(key))
                .iter()
                .all(|c| !matches_clause(doc, c))
        };
        let should = clause_list(bool_clause.get("should"));
        let should_ok = should.is_empty() || should.iter().any(|c| matches_clause(doc, c));
        return all_of("filter") && all_of("must") && none_of("must_not") && should_ok;
    }

    false
}

/// Normalizes a bool-clause entry: absent → [], object → [object], array → array.
fn clause_list(entry: Option<&Value>) -> Vec<&Value> {
    match entry {
        None => Vec::new(),
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Resolves a possibly dotted path against a document.
///
/// Tries the literal key first (physical keys contain no dots, but logical
/// paths stored verbatim might), then walks dot segments. Arrays match if
/// any element resolves.
fn resolve_path<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    if let Some(v) = doc.get(path) {
        return vec![v];
    }

    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(arr) => {
                    for elem in arr {
                        if let Some(v) = elem.get(segment) {
                            next.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
        if current.is_empty() {
            return current;
        }
    }
    current
}

fn field_matches(doc: &Value, path: &str, expected: &Value) -> bool {
    resolve_path(doc, path).iter().any(|&actual| match actual {
        Value::Array(arr) => arr.iter().any(|v| v == expected),
        other => other == expected,
    })
}

fn range_matches(doc: &Value, path: &str, bounds: &Value) -> bool {
    let Some(bounds) = bounds.as_object() else {
        return false;
    };
    resolve_path(doc, path).iter().any(|&actual| {
        bounds.iter().all(|(op, bound)| match op.as_str() {
            "gte" => compare(actual, bound).map_or(false, |o| o >= 0),
            "gt" => compare(actual, bound).map_or(false, |o| o > 0),
            "lte" => compare(actual, bound).map_or(false, |o| o <= 0),
            "lt" => compare(actual, bound).map_or(false, |o| o < 0),
            _ => false,
        })
    })
}

/// Three-way comparison over numbers and strings; None when incomparable.
fn compare(actual: &Value, bound: &Value) -> Option<i8> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64()?, b.as_f64()?);
            Some(if a < b {
                -1
            } else if a > b {
                1
            } else {
                0
            })
        }
        (Value::String(a), Value::String(b)) => Some(match a.cmp(b) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_users() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(
            "app",
            "user",
            "u1",
            json!({ "id": "u1", "email__v1": "alice@example.org", "age__v1": 30 }),
        );
        store.insert(
            "app",
            "user",
            "u2",
            json!({ "id": "u2", "email__v1": "bob@example.org", "age__v1": 41 }),
        );
        store
    }

    #[test]
    fn test_get_found_and_missing() {
        let store = store_with_users();
        assert_eq!(store.get("app", "user", "u1").unwrap()["id"], "u1");
        assert!(store.get("app", "user", "nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_term_search() {
        let store = store_with_users();
        let query = json!({ "query": { "term": { "email__v1": "alice@example.org" } } });
        let response = store.search("app", "user", &query).unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.first().unwrap()["id"], "u1");
    }

    #[test]
    fn test_term_search_count_only() {
        let store = store_with_users();
        let query = json!({
            "query": { "term": { "email__v1": "alice@example.org" } },
            "size": 0
        });
        let response = store.search("app", "user", &query).unwrap();
        assert_eq!(response.total, 1);
        assert!(response.hits.is_empty());
    }

    #[test]
    fn test_bool_must_not() {
        let store = store_with_users();
        let query = json!({
            "query": { "bool": {
                "must": [{ "match_all": {} }],
                "must_not": [{ "term": { "id": "u1" } }]
            } }
        });
        let response = store.search("app", "user", &query).unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.first().unwrap()["id"], "u2");
    }

    #[test]
    fn test_range_search() {
        let store = store_with_users();
        let query = json!({ "query": { "range": { "age__v1": { "gte": 40 } } } });
        let response = store.search("app", "user", &query).unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.first().unwrap()["id"], "u2");
    }

    #[test]
    fn test_multi_search_preserves_order() {
        let store = store_with_users();
        let items = vec![
            MultiSearchItem::new("app", "user", json!({ "query": { "term": { "id": "u2" } } })),
            MultiSearchItem::new("app", "user", json!({ "query": { "term": { "id": "u1" } } })),
            MultiSearchItem::new("app", "user", json!({ "query": { "term": { "id": "zz" } } })),
        ];
        let results = store.multi_search(&items).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["hits"]["total"], 1);
        assert_eq!(results[0]["hits"]["hits"][0]["_id"], "u2");
        assert_eq!(results[1]["hits"]["hits"][0]["_id"], "u1");
        assert_eq!(results[2]["hits"]["total"], 0);
    }

    #[test]
    fn test_bulk_create_does_not_overwrite() {
        let store = MemoryStore::new();
        let first = BulkOp::Create {
            index: "app".into(),
            doc_type: "user".into(),
            id: "u1".into(),
            body: json!({ "id": "u1", "name__v1": "first" }),
        };
        let second = BulkOp::Create {
            index: "app".into(),
            doc_type: "user".into(),
            id: "u1".into(),
            body: json!({ "id": "u1", "name__v1": "second" }),
        };
        let acks = store.bulk_write(&[first, second]).unwrap();
        assert!(acks[0].created);
        assert!(!acks[1].created);
        assert_eq!(store.get("app", "user", "u1").unwrap()["name__v1"], "first");
    }

    #[test]
    fn test_write_invisible_until_refresh() {
        let store = MemoryStore::new();
        let op = BulkOp::Update {
            index: "app".into(),
            doc_type: "user".into(),
            id: "u1".into(),
            body: json!({ "id": "u1" }),
        };
        store.bulk_write(&[op]).unwrap();

        let query = json!({ "query": { "match_all": {} } });
        assert_eq!(store.search("app", "user", &query).unwrap().total, 0);

        store.refresh("app").unwrap();
        assert_eq!(store.search("app", "user", &query).unwrap().total, 1);
    }

    #[test]
    fn test_nested_path_resolution() {
        let store = MemoryStore::new();
        store.insert(
            "app",
            "book",
            "b1",
            json!({ "id": "b1", "author__v1": { "name__v1": "Woolf" } }),
        );
        let query = json!({ "query": { "term": { "author__v1.name__v1": "Woolf" } } });
        assert_eq!(store.search("app", "book", &query).unwrap().total, 1);
    }
}
