//! Relation field validators
//!
//! Link references one document by id, Links a list of them. Existence is
//! never checked here directly; the validator consumes a pre-fetched
//! outcome keyed `{field}.exists` (Links: `{field}[{i}].exists`) supplied
//! by the batching orchestrator.

use serde_json::{json, Value};

use crate::patterns::ExternalResults;

use super::config::FieldConfig;
use super::validation::ValidationReport;

fn missing_target(name: &str, config: &FieldConfig, id: &str) -> String {
    let target = config.target.as_deref().unwrap_or("document");
    config.message(
        "exists",
        name,
        format!("referenced {} '{}' does not exist", target, id),
    )
}

pub fn validate_link(
    name: &str,
    value: &Value,
    config: &FieldConfig,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(id) = value.as_str() else {
        report.add_error(name, config.message("type", name, "expected a document id"));
        return report;
    };

    if let Some(false) = external.get(&format!("{}.exists", name)) {
        report.add_error(name, missing_target(name, config, id));
    }
    report
}

pub fn validate_links(
    name: &str,
    value: &Value,
    config: &FieldConfig,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(ids) = value.as_array() else {
        report.add_error(name, config.message("type", name, "expected a list of document ids"));
        return report;
    };

    for (i, id) in ids.iter().enumerate() {
        let Some(id) = id.as_str() else {
            report.add_error(name, format!("[{}]: expected a document id", i));
            continue;
        };
        if let Some(false) = external.get(&format!("{}[{}].exists", name, i)) {
            report.add_error(name, format!("[{}] {}", i, missing_target(name, config, id)));
        }
    }
    report
}

/// Physical form: the referenced id nested under a relation stub.
pub fn physical_link(value: &Value) -> Value {
    json!({ "id": value })
}

pub fn physical_links(value: &Value) -> Value {
    match value.as_array() {
        Some(ids) => Value::Array(ids.iter().map(physical_link).collect()),
        None => physical_link(value),
    }
}

/// Mapping stub for a relation; the definition compiler substitutes the
/// resolved remote document's properties alongside `id`.
pub fn relation_mapping() -> Value {
    json!({ "type": "object", "properties": { "id": { "type": "keyword" } } })
}
