//! Native query construction
//!
//! Translation rules:
//!
//! - quoted string query: phrase multi-match over the boosted field set
//! - unquoted string query: best-fields multi-match with fuzzy tolerance
//! - list-of-strings query: bool should of per-item phrase multi-matches
//! - filter value carrying gte/gt/lte/lt: range filter
//! - filter value that is a list: terms filter; scalar: term filter
//! - excludes: must_not filters
//! - group_by_counter items: one terms aggregation per item

use serde_json::{json, Map, Value};

use super::payload::{QueryInput, SearchPayload};

/// Boosted field set free-text queries match against: full text, then
/// prefix-, mid- and suffix-boosted variants.
pub const BOOST_FIELDS: [&str; 4] = [
    "full_text",
    "full_text_prefix^10",
    "full_text_mid^5",
    "full_text_suffix^2",
];

const RANGE_OPS: [&str; 4] = ["gte", "gt", "lte", "lt"];

/// Builds the store's native query body from a parsed payload.
pub fn build_query(payload: &SearchPayload) -> Value {
    let mut bool_clause = Map::new();

    if let Some(query) = &payload.query {
        bool_clause.insert("must".into(), json!([text_query(query)]));
    }

    let filter: Vec<Value> = payload
        .filters
        .must
        .iter()
        .map(|(field, value)| filter_clause(field, value))
        .collect();
    if !filter.is_empty() {
        bool_clause.insert("filter".into(), Value::Array(filter));
    }

    let should: Vec<Value> = payload
        .filters
        .should
        .iter()
        .map(|(field, value)| filter_clause(field, value))
        .collect();
    if !should.is_empty() {
        bool_clause.insert("should".into(), Value::Array(should));
        bool_clause.insert("minimum_should_match".into(), 1.into());
    }

    let must_not: Vec<Value> = payload
        .excludes
        .iter()
        .map(|(field, value)| filter_clause(field, value))
        .collect();
    if !must_not.is_empty() {
        bool_clause.insert("must_not".into(), Value::Array(must_not));
    }

    let query = if bool_clause.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": bool_clause })
    };

    let mut body = Map::new();
    body.insert("query".into(), query);

    if !payload.sort.is_empty() {
        let sort: Vec<Value> = payload.sort.iter().map(|clause| sort_clause(clause)).collect();
        body.insert("sort".into(), Value::Array(sort));
    }

    if let Some(counter) = &payload.group_by_counter {
        let mut aggs = Map::new();
        for item in &counter.items {
            aggs.insert(
                item.clone(),
                json!({ "terms": { "field": item, "size": counter.size } }),
            );
        }
        body.insert("aggs".into(), Value::Object(aggs));
    }

    Value::Object(body)
}

fn phrase_match(text: &str) -> Value {
    json!({
        "multi_match": {
            "query": text,
            "fields": BOOST_FIELDS,
            "type": "phrase"
        }
    })
}

fn text_query(query: &QueryInput) -> Value {
    match query {
        QueryInput::Text(text) => {
            if query.is_phrase() {
                let trimmed = text.trim();
                phrase_match(&trimmed[1..trimmed.len() - 1])
            } else {
                json!({
                    "multi_match": {
                        "query": text,
                        "fields": BOOST_FIELDS,
                        "type": "best_fields",
                        "fuzziness": "AUTO",
                        "tie_breaker": 0.3
                    }
                })
            }
        }
        QueryInput::Terms(items) => {
            let should: Vec<Value> = items.iter().map(|item| phrase_match(item)).collect();
            json!({ "bool": { "should": should, "minimum_should_match": 1 } })
        }
    }
}

fn is_range(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.keys().any(|key| RANGE_OPS.contains(&key.as_str())))
        .unwrap_or(false)
}

fn filter_clause(field: &str, value: &Value) -> Value {
    if is_range(value) {
        json!({ "range": { field: value } })
    } else if value.is_array() {
        json!({ "terms": { field: value } })
    } else {
        json!({ "term": { field: value } })
    }
}

fn sort_clause(clause: &str) -> Value {
    match clause.split_once(':') {
        Some((field, direction)) => json!({ field: { "order": direction } }),
        None => json!({ clause: { "order": "asc" } }),
    }
}
