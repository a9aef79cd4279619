//! Search payload types
//!
//! The generic request shape accepted by list/search operations:
//!
//! ```json
//! {
//!   "query": "\"exact phrase\"",
//!   "filters": { "must": { "status": "live" }, "should": {} },
//!   "excludes": { "id": "u1" },
//!   "sort": ["created_on:desc"],
//!   "group_by_counter": { "items": ["status"], "size": 20 }
//! }
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};

/// Default bucket size for counter aggregations.
const DEFAULT_GROUP_SIZE: u64 = 20;

/// Free-text query input: one string or a list of strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueryInput {
    Text(String),
    Terms(Vec<String>),
}

impl QueryInput {
    /// True for a quoted string, which is matched as a phrase.
    pub fn is_phrase(&self) -> bool {
        match self {
            QueryInput::Text(text) => {
                let trimmed = text.trim();
                trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"')
            }
            QueryInput::Terms(_) => false,
        }
    }
}

/// Must/should filter maps, field name to filter value.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Filters {
    #[serde(default)]
    pub must: Map<String, Value>,
    #[serde(default)]
    pub should: Map<String, Value>,
}

/// Term-aggregation request: one bucket set per item.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GroupByCounter {
    pub items: Vec<String>,
    #[serde(default = "default_group_size")]
    pub size: u64,
}

fn default_group_size() -> u64 {
    DEFAULT_GROUP_SIZE
}

/// A parsed search payload.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchPayload {
    #[serde(default)]
    pub query: Option<QueryInput>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub excludes: Map<String, Value>,
    /// Sort clauses, `field` or `field:desc`
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub group_by_counter: Option<GroupByCounter>,
}

impl SearchPayload {
    /// Parses a raw JSON payload.
    pub fn parse(raw: &Value) -> QueryResult<Self> {
        serde_json::from_value(raw.clone()).map_err(|e| QueryError::InvalidPayload(e.to_string()))
    }
}
