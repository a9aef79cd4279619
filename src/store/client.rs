//! Store client contract
//!
//! Trait implemented by anything that can answer document reads, searches
//! and bulk writes. The engine consumes `&dyn StoreClient` so the transport
//! can be swapped without touching the mapping layer.

use serde_json::Value;

use super::errors::{StoreError, StoreResult};

/// One sub-query of a batched multi-search.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSearchItem {
    /// Target index
    pub index: String,
    /// Target document type
    pub doc_type: String,
    /// Native query body
    pub query: Value,
}

impl MultiSearchItem {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>, query: Value) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            query,
        }
    }
}

/// One operation of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Create a document; acked with `created: false` if it already exists
    Create {
        index: String,
        doc_type: String,
        id: String,
        body: Value,
    },
    /// Create or replace a document
    Update {
        index: String,
        doc_type: String,
        id: String,
        body: Value,
    },
}

impl BulkOp {
    /// Document id targeted by this operation.
    pub fn id(&self) -> &str {
        match self {
            BulkOp::Create { id, .. } | BulkOp::Update { id, .. } => id,
        }
    }
}

/// Per-operation acknowledgement of a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAck {
    /// Document id
    pub id: String,
    /// True when the operation wrote a new document
    pub created: bool,
}

/// Parsed search response.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// Total number of matching documents
    pub total: u64,
    /// Matched document sources, up to the requested size
    pub hits: Vec<Value>,
}

impl SearchResponse {
    /// Parses the store's native `{"hits": {"total": N, "hits": [...]}}`
    /// envelope.
    pub fn from_value(raw: &Value) -> StoreResult<Self> {
        let hits_obj = raw
            .get("hits")
            .and_then(Value::as_object)
            .ok_or_else(|| StoreError::Malformed("missing hits object".into()))?;

        let total = hits_obj
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::Malformed("missing hits.total".into()))?;

        let hits = hits_obj
            .get("hits")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|hit| hit.get("_source").cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { total, hits })
    }

    /// First matching document, if any.
    pub fn first(&self) -> Option<&Value> {
        self.hits.first()
    }

    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Synchronous client for the remote search/index store.
pub trait StoreClient {
    /// Fetches one document by id.
    fn get(&self, index: &str, doc_type: &str, id: &str) -> StoreResult<Value>;

    /// Runs one query and parses the response envelope.
    fn search(&self, index: &str, doc_type: &str, query: &Value) -> StoreResult<SearchResponse>;

    /// Runs every sub-query in one round trip.
    ///
    /// Returns raw response bodies in request order.
    fn multi_search(&self, items: &[MultiSearchItem]) -> StoreResult<Vec<Value>>;

    /// Applies a batch of create/update operations.
    fn bulk_write(&self, ops: &[BulkOp]) -> StoreResult<Vec<BulkAck>>;

    /// Makes prior writes visible to subsequent reads.
    fn refresh(&self, index: &str) -> StoreResult<()>;
}
