//! Nested field validators
//!
//! Map carries one nested object, MapList a list of them, List a
//! homogeneous scalar array. Nested failures bubble up under the parent
//! field's error key; a failing child always fails the parent.

use serde_json::{Map, Value};

use crate::patterns::ExternalResults;

use super::config::{FieldConfig, ScalarKind};
use super::scalar;
use super::validation::ValidationReport;
use super::Field;

/// Validates every declared child against one nested object.
fn validate_items(
    children: &[Field],
    obj: &Map<String, Value>,
    document: &Value,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();
    for child in children {
        if let Some(value) = obj.get(&child.name) {
            report.merge(child.validate(value, document, external));
        }
    }
    report
}

pub fn validate_map(
    field: &Field,
    value: &Value,
    document: &Value,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(obj) = value.as_object() else {
        report.add_error(&field.name, field.config.message("type", &field.name, "expected an object"));
        return report;
    };

    let nested = validate_items(&field.children, obj, document, external);
    report.absorb_nested(&field.name, nested);
    report
}

pub fn validate_map_list(
    field: &Field,
    value: &Value,
    document: &Value,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(items) = value.as_array() else {
        report.add_error(&field.name, field.config.message("type", &field.name, "expected a list of objects"));
        return report;
    };

    for (i, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            report.add_error(&field.name, format!("[{}]: expected an object", i));
            continue;
        };
        let nested = validate_items(&field.children, obj, document, external);
        for (child, messages) in nested.errors() {
            if let Some(first) = messages.first() {
                report.add_error(&field.name, format!("[{}] {}: {}", i, child, first));
            }
        }
    }
    report
}

pub fn validate_list(field: &Field, value: &Value, config: &FieldConfig) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(items) = value.as_array() else {
        report.add_error(&field.name, config.message("type", &field.name, "expected a list"));
        return report;
    };

    // Element type is mandatory at construction; every element is checked,
    // failures aggregate per element.
    let item_type = config.item_type.unwrap_or(ScalarKind::String);
    for (i, item) in items.iter().enumerate() {
        if !item_type.accepts(item) {
            report.add_error(
                &field.name,
                format!("[{}]: expected a {} value", i, item_type.as_str()),
            );
        }
    }
    report
}

/// Physical form of one nested object: declared children only, keys
/// version-qualified.
pub fn physical_map(field: &Field, value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let mut physical = Map::new();
    for child in &field.children {
        if let Some(child_value) = obj.get(&child.name) {
            physical.insert(child.physical_key(), child.physical_value(child_value));
        }
    }
    Value::Object(physical)
}

pub fn physical_map_list(field: &Field, value: &Value) -> Value {
    match value.as_array() {
        Some(items) => Value::Array(items.iter().map(|item| physical_map(field, item)).collect()),
        None => value.clone(),
    }
}

fn child_properties(field: &Field) -> Value {
    let mut properties = Map::new();
    for child in &field.children {
        properties.insert(child.physical_key(), child.mapping());
    }
    Value::Object(properties)
}

pub fn mapping_map(field: &Field) -> Value {
    serde_json::json!({ "type": "object", "properties": child_properties(field) })
}

pub fn mapping_map_list(field: &Field) -> Value {
    serde_json::json!({ "type": "nested", "properties": child_properties(field) })
}

pub fn mapping_list(config: &FieldConfig) -> Value {
    scalar::scalar_mapping(config.item_type.unwrap_or(ScalarKind::String))
}
