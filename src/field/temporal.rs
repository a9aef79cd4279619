//! DateTime field support
//!
//! Datetime values cross the wire in one fixed format; range bounds are
//! compared on parsed values, never as strings.

use chrono::{NaiveDateTime, Utc};
use serde_json::Value;

use super::config::FieldConfig;
use super::validation::ValidationReport;

/// Wire format for datetime values.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Mapping-side date format, equivalent to `WIRE_FORMAT`.
pub const MAPPING_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ss";

/// Parses a wire-format datetime.
pub fn parse_wire(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, WIRE_FORMAT).ok()
}

/// Formats a datetime in wire form.
pub fn format_wire(value: NaiveDateTime) -> String {
    value.format(WIRE_FORMAT).to_string()
}

/// The current instant in wire form.
pub fn now_wire() -> String {
    format_wire(Utc::now().naive_utc())
}

/// Validates a datetime value against its configuration.
pub fn validate(name: &str, value: &Value, config: &FieldConfig) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(raw) = value.as_str() else {
        report.add_error(
            name,
            config.message("type", name, format!("expected a {} datetime string", WIRE_FORMAT)),
        );
        return report;
    };

    let Some(parsed) = parse_wire(raw) else {
        report.add_error(
            name,
            config.message("format", name, format!("'{}' is not a {} datetime", raw, WIRE_FORMAT)),
        );
        return report;
    };

    if let Some(min) = config.min_date {
        if parsed < min {
            report.add_error(
                name,
                config.message("min_value", name, format!("must not be before {}", format_wire(min))),
            );
        }
    }
    if let Some(max) = config.max_date {
        if parsed > max {
            report.add_error(
                name,
                config.message("max_value", name, format!("must not be after {}", format_wire(max))),
            );
        }
    }

    report
}

/// Physical value for a datetime field.
///
/// Auto-generated fields ignore the incoming value; construction already
/// rejected configs that combine both.
pub fn physical_value(value: &Value, config: &FieldConfig) -> Value {
    if config.is_create_date || config.is_timestamp {
        return Value::String(now_wire());
    }
    match value {
        Value::Null => config
            .default
            .clone()
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}
