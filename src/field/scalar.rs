//! Scalar field validators
//!
//! String, Number, Text and Check semantics:
//!
//! - Length bounds pass at the bound and fail strictly outside it
//! - Numeric bounds pass on equality
//! - Named validations are resolved through externally supplied pattern
//!   results, keyed `{field}.{validation}`, short-circuiting on the first
//!   failure
//! - Check has no constraints beyond its type

use serde_json::{json, Value};

use crate::patterns::ExternalResults;

use super::config::{FieldConfig, ScalarKind};
use super::temporal;
use super::validation::ValidationReport;

/// Index mapping fragment for one scalar kind.
pub fn scalar_mapping(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String => json!({ "type": "keyword" }),
        ScalarKind::Number => json!({ "type": "double" }),
        ScalarKind::Date => json!({ "type": "date", "format": temporal::MAPPING_FORMAT }),
        ScalarKind::Check => json!({ "type": "boolean" }),
    }
}

pub fn validate_string(
    name: &str,
    value: &Value,
    config: &FieldConfig,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(text) = value.as_str() else {
        report.add_error(name, config.message("type", name, "expected a string"));
        return report;
    };

    check_length(name, text, config, &mut report);

    if let Some(choices) = &config.choices {
        if !choices.iter().any(|choice| choice == value) {
            report.add_error(
                name,
                config.message("choices", name, format!("'{}' is not an allowed choice", text)),
            );
        }
    }

    if let Some(pattern) = &config.pattern {
        if !pattern.is_match(text) {
            report.add_error(
                name,
                config.message("pattern", name, format!("'{}' does not match the expected format", text)),
            );
        }
    }

    check_external(name, config, external, &mut report);
    report
}

pub fn validate_number(
    name: &str,
    value: &Value,
    config: &FieldConfig,
    external: &ExternalResults,
) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(number) = value.as_f64() else {
        report.add_error(name, config.message("type", name, "expected a number"));
        return report;
    };

    if let Some(min) = config.min_value {
        if number < min {
            report.add_error(
                name,
                config.message("min_value", name, format!("must be at least {}", min)),
            );
        }
    }
    if let Some(max) = config.max_value {
        if number > max {
            report.add_error(
                name,
                config.message("max_value", name, format!("must be at most {}", max)),
            );
        }
    }
    if config.only_positive && number < 0.0 {
        report.add_error(name, config.message("only_positive", name, "must not be negative"));
    }
    if config.only_negative && number > 0.0 {
        report.add_error(name, config.message("only_negative", name, "must not be positive"));
    }

    check_external(name, config, external, &mut report);
    report
}

pub fn validate_text(name: &str, value: &Value, config: &FieldConfig) -> ValidationReport {
    let mut report = ValidationReport::passing();

    let Some(text) = value.as_str() else {
        report.add_error(name, config.message("type", name, "expected a string"));
        return report;
    };

    check_length(name, text, config, &mut report);
    report
}

pub fn validate_check(name: &str, value: &Value, config: &FieldConfig) -> ValidationReport {
    let mut report = ValidationReport::passing();
    if !value.is_boolean() {
        report.add_error(name, config.message("type", name, "expected a boolean"));
    }
    report
}

/// Length bounds shared by String and Text. Valid exactly at the bound.
fn check_length(name: &str, text: &str, config: &FieldConfig, report: &mut ValidationReport) {
    let length = text.chars().count() as u64;
    if let Some(min) = config.min_length {
        if length < min {
            report.add_error(
                name,
                config.message("min_length", name, format!("must be at least {} characters", min)),
            );
        }
    }
    if let Some(max) = config.max_length {
        if length > max {
            report.add_error(
                name,
                config.message("max_length", name, format!("must be at most {} characters", max)),
            );
        }
    }
}

/// Consults pre-fetched pattern outcomes for every declared validation,
/// stopping at the first failure. A validation the batch never ran is
/// skipped; supplying the results is the orchestrator's contract.
fn check_external(
    name: &str,
    config: &FieldConfig,
    external: &ExternalResults,
    report: &mut ValidationReport,
) {
    for validation in &config.validations {
        let key = format!("{}.{}", name, validation);
        if let Some(false) = external.get(&key) {
            report.add_error(
                name,
                config.message(validation, name, format!("failed '{}' validation", validation)),
            );
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use serde_json::json;

    fn config(kind: FieldKind, value: Value) -> FieldConfig {
        FieldConfig::parse("f", kind, value.as_object().unwrap()).unwrap()
    }

    fn no_external() -> ExternalResults {
        ExternalResults::new()
    }

    #[test]
    fn test_string_length_inclusive_at_bounds() {
        let config = config(FieldKind::String, json!({ "min_length": 2, "max_length": 4 }));
        let ext = no_external();
        assert!(validate_string("f", &json!("ab"), &config, &ext).is_ok());
        assert!(validate_string("f", &json!("abcd"), &config, &ext).is_ok());
        assert!(!validate_string("f", &json!("a"), &config, &ext).is_ok());
        assert!(!validate_string("f", &json!("abcde"), &config, &ext).is_ok());
    }

    #[test]
    fn test_string_type_mismatch() {
        let config = config(FieldKind::String, json!({}));
        let report = validate_string("f", &json!(42), &config, &no_external());
        assert_eq!(report.field_errors("f"), ["expected a string"]);
    }

    #[test]
    fn test_string_choices_membership() {
        let config = config(FieldKind::String, json!({ "choices": ["draft", "live"] }));
        let ext = no_external();
        assert!(validate_string("f", &json!("draft"), &config, &ext).is_ok());
        assert!(!validate_string("f", &json!("archived"), &config, &ext).is_ok());
    }

    #[test]
    fn test_string_pattern() {
        let config = config(FieldKind::String, json!({ "pattern": "^[a-z0-9-]+$" }));
        let ext = no_external();
        assert!(validate_string("f", &json!("a-slug-42"), &config, &ext).is_ok());
        assert!(!validate_string("f", &json!("Not A Slug"), &config, &ext).is_ok());
    }

    #[test]
    fn test_string_external_short_circuits() {
        let config = config(
            FieldKind::String,
            json!({ "validations": ["not_exists", "exists"] }),
        );
        let mut ext = ExternalResults::new();
        ext.insert("f.not_exists", false);
        ext.insert("f.exists", false);
        let report = validate_string("f", &json!("x"), &config, &ext);
        // Only the first failing validation reports.
        assert_eq!(report.field_errors("f").len(), 1);
        assert!(report.field_errors("f")[0].contains("not_exists"));
    }

    #[test]
    fn test_number_bound_equality_passes() {
        let config = config(FieldKind::Number, json!({ "min_value": 0, "max_value": 10 }));
        let ext = no_external();
        assert!(validate_number("f", &json!(0), &config, &ext).is_ok());
        assert!(validate_number("f", &json!(10), &config, &ext).is_ok());
        assert!(!validate_number("f", &json!(11), &config, &ext).is_ok());
        assert!(!validate_number("f", &json!(-1), &config, &ext).is_ok());
    }

    #[test]
    fn test_number_sign_flags() {
        let positive = config(FieldKind::Number, json!({ "only_positive": true }));
        let negative = config(FieldKind::Number, json!({ "only_negative": true }));
        let ext = no_external();
        assert!(validate_number("f", &json!(5), &positive, &ext).is_ok());
        assert!(!validate_number("f", &json!(-5), &positive, &ext).is_ok());
        assert!(validate_number("f", &json!(-5), &negative, &ext).is_ok());
        assert!(!validate_number("f", &json!(5), &negative, &ext).is_ok());
        // Zero passes both.
        assert!(validate_number("f", &json!(0), &positive, &ext).is_ok());
        assert!(validate_number("f", &json!(0), &negative, &ext).is_ok());
    }

    #[test]
    fn test_number_custom_message() {
        let config = config(
            FieldKind::Number,
            json!({ "max_value": 10, "messages": { "max_value": "{field} is over the cap" } }),
        );
        let report = validate_number("f", &json!(11), &config, &no_external());
        assert_eq!(report.field_errors("f"), ["f is over the cap"]);
    }

    #[test]
    fn test_text_length_only() {
        let config = config(FieldKind::Text, json!({ "max_length": 3 }));
        assert!(validate_text("f", &json!("abc"), &config).is_ok());
        assert!(!validate_text("f", &json!("abcd"), &config).is_ok());
    }

    #[test]
    fn test_check_accepts_booleans_only() {
        let config = config(FieldKind::Check, json!({}));
        assert!(validate_check("f", &json!(true), &config).is_ok());
        assert!(validate_check("f", &json!(false), &config).is_ok());
        assert!(!validate_check("f", &json!("true"), &config).is_ok());
    }
}
