//! Field configuration
//!
//! One immutable `FieldConfig` is parsed per field instance from the raw
//! attribute map, checked eagerly against the kind's whitelist. Nothing is
//! shared between instances and nothing is mutated after construction.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::{Map, Value};

use super::errors::{ConfigurationError, FieldResult};
use super::temporal;
use super::FieldKind;

/// Element type of a `List` field, taken from its `list:{scalar}` type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Date,
    Check,
}

impl ScalarKind {
    /// Parses the parametrized part of a `list:{scalar}` type tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ScalarKind::String),
            "number" => Some(ScalarKind::Number),
            "date" => Some(ScalarKind::Date),
            "check" => Some(ScalarKind::Check),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Date => "date",
            ScalarKind::Check => "check",
        }
    }

    /// Type check for one list element.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ScalarKind::String => value.is_string(),
            ScalarKind::Number => value.is_number(),
            ScalarKind::Date => value
                .as_str()
                .map_or(false, |s| temporal::parse_wire(s).is_some()),
            ScalarKind::Check => value.is_boolean(),
        }
    }
}

/// Per-instance field configuration.
///
/// Only the attributes meaningful to the owning kind are ever set; the
/// whitelist check at construction guarantees no others were supplied.
#[derive(Debug, Clone, Default)]
pub struct FieldConfig {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub only_positive: bool,
    pub only_negative: bool,
    pub choices: Option<Vec<Value>>,
    /// Named validations resolved through externally supplied pattern results
    pub validations: Vec<String>,
    /// Format check applied to string values
    pub pattern: Option<Regex>,
    /// Per-rule message template overrides
    pub messages: BTreeMap<String, String>,
    pub default: Option<Value>,
    pub is_create_date: bool,
    pub is_timestamp: bool,
    pub min_date: Option<NaiveDateTime>,
    pub max_date: Option<NaiveDateTime>,
    /// Uniqueness sugar; the definition compiler expands it into a
    /// not-exists validation
    pub is_unique: bool,
    /// Element type of a List field
    pub item_type: Option<ScalarKind>,
    /// Referenced document type of a Link/Links field
    pub target: Option<String>,
}

impl FieldConfig {
    /// Parses the raw attribute map for one field.
    ///
    /// `type`, `version` and `items` are structural and handled by the
    /// caller; everything else lands here. Unknown keys were already
    /// rejected by the whitelist check.
    pub fn parse(field: &str, kind: FieldKind, attrs: &Map<String, Value>) -> FieldResult<Self> {
        let mut config = FieldConfig::default();

        for (key, value) in attrs {
            match key.as_str() {
                "type" | "version" | "items" => {}
                "min_length" => config.min_length = Some(parse_u64(field, key, value)?),
                "max_length" => config.max_length = Some(parse_u64(field, key, value)?),
                "min_value" => match kind {
                    FieldKind::DateTime => config.min_date = Some(parse_date(field, key, value)?),
                    _ => config.min_value = Some(parse_f64(field, key, value)?),
                },
                "max_value" => match kind {
                    FieldKind::DateTime => config.max_date = Some(parse_date(field, key, value)?),
                    _ => config.max_value = Some(parse_f64(field, key, value)?),
                },
                "only_positive" => config.only_positive = parse_bool(field, key, value)?,
                "only_negative" => config.only_negative = parse_bool(field, key, value)?,
                "choices" => config.choices = Some(parse_choices(field, value)?),
                "validations" => config.validations = parse_string_list(field, key, value)?,
                "pattern" => config.pattern = Some(parse_pattern(field, value)?),
                "messages" => config.messages = parse_messages(field, value)?,
                "default" => {
                    if kind == FieldKind::DateTime {
                        parse_date(field, key, value)?;
                    }
                    config.default = Some(value.clone());
                }
                "is_create_date" => config.is_create_date = parse_bool(field, key, value)?,
                "is_timestamp" => config.is_timestamp = parse_bool(field, key, value)?,
                "is_unique" => config.is_unique = parse_bool(field, key, value)?,
                "target" => {
                    config.target = Some(
                        value
                            .as_str()
                            .ok_or_else(|| {
                                ConfigurationError::invalid_attribute(field, key, "expected a string")
                            })?
                            .to_string(),
                    )
                }
                // Whitelist and match arms must stay in step; a key passing
                // the whitelist but not matched here is a programming error.
                other => {
                    return Err(ConfigurationError::invalid_attribute(
                        field,
                        other,
                        "attribute accepted by whitelist but not parsed",
                    ))
                }
            }
        }

        config.check_consistency(field, kind)?;
        Ok(config)
    }

    fn check_consistency(&self, field: &str, kind: FieldKind) -> FieldResult<()> {
        if kind == FieldKind::DateTime {
            if self.is_create_date && self.is_timestamp {
                return Err(ConfigurationError::conflicting(
                    field,
                    "is_create_date and is_timestamp cannot both be set",
                ));
            }
            if self.default.is_some() && (self.is_create_date || self.is_timestamp) {
                return Err(ConfigurationError::conflicting(
                    field,
                    "an explicit default cannot be combined with an auto-generated timestamp",
                ));
            }
        }
        if self.only_positive && self.only_negative {
            return Err(ConfigurationError::conflicting(
                field,
                "only_positive and only_negative cannot both be set",
            ));
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ConfigurationError::conflicting(
                    field,
                    "min_length exceeds max_length",
                ));
            }
        }
        Ok(())
    }

    /// Message for a rule: the configured template with `{field}`
    /// substituted, or the built-in default.
    pub fn message(&self, rule: &str, field: &str, default: impl Into<String>) -> String {
        match self.messages.get(rule) {
            Some(template) => template.replace("{field}", field),
            None => default.into(),
        }
    }

    /// The configuration attributes as a plain map, for the self-describing
    /// definition document. Only set attributes appear.
    pub fn def_attrs(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        if let Some(v) = self.min_length {
            attrs.insert("min_length".into(), v.into());
        }
        if let Some(v) = self.max_length {
            attrs.insert("max_length".into(), v.into());
        }
        if let Some(v) = self.min_value {
            attrs.insert("min_value".into(), v.into());
        }
        if let Some(v) = self.max_value {
            attrs.insert("max_value".into(), v.into());
        }
        if self.only_positive {
            attrs.insert("only_positive".into(), true.into());
        }
        if self.only_negative {
            attrs.insert("only_negative".into(), true.into());
        }
        if let Some(choices) = &self.choices {
            attrs.insert("choices".into(), Value::Array(choices.clone()));
        }
        if !self.validations.is_empty() {
            attrs.insert(
                "validations".into(),
                Value::Array(self.validations.iter().map(|v| v.as_str().into()).collect()),
            );
        }
        if let Some(pattern) = &self.pattern {
            attrs.insert("pattern".into(), pattern.as_str().into());
        }
        if let Some(default) = &self.default {
            attrs.insert("default".into(), default.clone());
        }
        if self.is_create_date {
            attrs.insert("is_create_date".into(), true.into());
        }
        if self.is_timestamp {
            attrs.insert("is_timestamp".into(), true.into());
        }
        if self.is_unique {
            attrs.insert("is_unique".into(), true.into());
        }
        if let Some(min) = self.min_date {
            attrs.insert("min_value".into(), temporal::format_wire(min).into());
        }
        if let Some(max) = self.max_date {
            attrs.insert("max_value".into(), temporal::format_wire(max).into());
        }
        if let Some(item_type) = self.item_type {
            attrs.insert("item_type".into(), item_type.as_str().into());
        }
        if let Some(target) = &self.target {
            attrs.insert("target".into(), target.as_str().into());
        }
        attrs
    }
}

fn parse_u64(field: &str, attr: &str, value: &Value) -> FieldResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| ConfigurationError::invalid_attribute(field, attr, "expected a non-negative integer"))
}

fn parse_f64(field: &str, attr: &str, value: &Value) -> FieldResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ConfigurationError::invalid_attribute(field, attr, "expected a number"))
}

fn parse_bool(field: &str, attr: &str, value: &Value) -> FieldResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| ConfigurationError::invalid_attribute(field, attr, "expected a boolean"))
}

fn parse_date(field: &str, attr: &str, value: &Value) -> FieldResult<NaiveDateTime> {
    value
        .as_str()
        .and_then(temporal::parse_wire)
        .ok_or_else(|| {
            ConfigurationError::invalid_attribute(
                field,
                attr,
                format!("expected a datetime in {} form", temporal::WIRE_FORMAT),
            )
        })
}

fn parse_choices(field: &str, value: &Value) -> FieldResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::String(name) => Err(ConfigurationError::invalid_attribute(
            field,
            "choices",
            format!("unresolved choice set reference '{}'", name),
        )),
        _ => Err(ConfigurationError::invalid_attribute(
            field,
            "choices",
            "expected an array",
        )),
    }
}

fn parse_string_list(field: &str, attr: &str, value: &Value) -> FieldResult<Vec<String>> {
    value
        .as_array()
        .and_then(|arr| {
            arr.iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| ConfigurationError::invalid_attribute(field, attr, "expected an array of strings"))
}

fn parse_pattern(field: &str, value: &Value) -> FieldResult<Regex> {
    let source = value
        .as_str()
        .ok_or_else(|| ConfigurationError::invalid_attribute(field, "pattern", "expected a string"))?;
    Regex::new(source)
        .map_err(|e| ConfigurationError::invalid_attribute(field, "pattern", format!("invalid regex: {}", e)))
}

fn parse_messages(field: &str, value: &Value) -> FieldResult<BTreeMap<String, String>> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigurationError::invalid_attribute(field, "messages", "expected an object"))?;
    obj.iter()
        .map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), s.to_string()))
                .ok_or_else(|| {
                    ConfigurationError::invalid_attribute(field, "messages", "expected string templates")
                })
        })
        .collect()
}
