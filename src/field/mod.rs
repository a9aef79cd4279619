//! Field type system for strata
//!
//! Every document field is an instance of one closed kind. A field is
//! configuration only: constructed per use from a raw attribute map,
//! validated eagerly, never persisted as an object.
//!
//! # Capabilities
//!
//! - `validate` - value validation against the configuration, with
//!   store-dependent checks consumed from pre-fetched `ExternalResults`
//! - `mapping` - index mapping fragment, keyed on physical names
//! - `physical_value` / `physical_key` - store-facing projection
//! - `field_items` - (logical name, physical key) pairs, children included
//! - `def_physical` / `def_mapping` - the field's own configuration as a
//!   storable, mappable document fragment under the same version-suffix
//!   convention as ordinary data

mod config;
mod errors;
mod nested;
mod relation;
mod scalar;
mod temporal;
mod validation;

pub use config::{FieldConfig, ScalarKind};
pub use errors::{ConfigurationError, FieldResult};
pub use temporal::{MAPPING_FORMAT, WIRE_FORMAT};
pub use validation::ValidationReport;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::patterns::ExternalResults;

/// The closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Text,
    Check,
    #[serde(rename = "datetime")]
    DateTime,
    Map,
    MapList,
    List,
    Link,
    Links,
}

impl FieldKind {
    /// Parses a raw type tag. `list` is parametrized: `list:number` yields
    /// the kind plus its element type.
    pub fn parse(tag: &str) -> Option<(FieldKind, Option<ScalarKind>)> {
        if let Some(item) = tag.strip_prefix("list:") {
            return ScalarKind::parse(item).map(|s| (FieldKind::List, Some(s)));
        }
        let kind = match tag {
            "string" => FieldKind::String,
            "number" => FieldKind::Number,
            "text" => FieldKind::Text,
            "check" => FieldKind::Check,
            "datetime" => FieldKind::DateTime,
            "map" => FieldKind::Map,
            "map_list" => FieldKind::MapList,
            "link" => FieldKind::Link,
            "links" => FieldKind::Links,
            _ => return None,
        };
        Some((kind, None))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Text => "text",
            FieldKind::Check => "check",
            FieldKind::DateTime => "datetime",
            FieldKind::Map => "map",
            FieldKind::MapList => "map_list",
            FieldKind::List => "list",
            FieldKind::Link => "link",
            FieldKind::Links => "links",
        }
    }

    /// Attribute whitelist; unknown keys fail construction.
    pub fn allowed_attrs(&self) -> &'static [&'static str] {
        match self {
            FieldKind::String => &[
                "type",
                "version",
                "min_length",
                "max_length",
                "choices",
                "validations",
                "pattern",
                "messages",
                "is_unique",
            ],
            FieldKind::Number => &[
                "type",
                "version",
                "min_value",
                "max_value",
                "only_positive",
                "only_negative",
                "validations",
                "messages",
                "is_unique",
            ],
            FieldKind::Text => &["type", "version", "min_length", "max_length", "messages"],
            FieldKind::Check => &["type", "version", "messages"],
            FieldKind::DateTime => &[
                "type",
                "version",
                "default",
                "is_create_date",
                "is_timestamp",
                "min_value",
                "max_value",
                "messages",
            ],
            FieldKind::Map => &["type", "version", "items"],
            FieldKind::MapList => &["type", "version", "items"],
            FieldKind::List => &["type", "version", "messages"],
            FieldKind::Link => &["type", "version", "target", "messages"],
            FieldKind::Links => &["type", "version", "target", "messages"],
        }
    }

    /// True for kinds carrying nested child fields.
    pub fn has_children(&self) -> bool {
        matches!(self, FieldKind::Map | FieldKind::MapList)
    }

    /// True for kinds referencing other documents.
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldKind::Link | FieldKind::Links)
    }
}

/// One (logical name, physical key) pair contributed by a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
    /// Dotted logical path (`author.name` for nested fields)
    pub logical: String,
    /// Version-qualified physical key of the leaf (`name__v2`)
    pub physical: String,
}

/// A configured field instance.
#[derive(Debug, Clone)]
pub struct Field {
    /// Plain field name (no version suffix)
    pub name: String,
    /// Owning document type
    pub doc_type: String,
    /// Version this instance reads and writes
    pub version: u32,
    pub kind: FieldKind,
    pub config: FieldConfig,
    /// Nested child fields (Map/MapList only)
    pub children: Vec<Field>,
}

impl Field {
    /// Builds a field from its raw specification.
    ///
    /// Configuration is validated eagerly: an unknown type tag, an
    /// attribute outside the kind's whitelist, or an unusable attribute
    /// value all fail construction.
    pub fn new(
        doc_type: &str,
        name: &str,
        spec: &Value,
        default_version: u32,
    ) -> FieldResult<Self> {
        let attrs = spec
            .as_object()
            .ok_or_else(|| {
                ConfigurationError::invalid_attribute(name, "spec", "field specification must be an object")
            })?;

        let tag = attrs
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigurationError::unknown_kind(name, "<missing>"))?;
        let (kind, item_type) =
            FieldKind::parse(tag).ok_or_else(|| ConfigurationError::unknown_kind(name, tag))?;

        let allowed = kind.allowed_attrs();
        let unknown: Vec<String> = attrs
            .keys()
            .filter(|key| !allowed.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigurationError::unknown_attributes(name, unknown));
        }

        let version = match attrs.get("version") {
            None => default_version,
            Some(v) => v
                .as_u64()
                .filter(|v| *v >= 1)
                .map(|v| v as u32)
                .ok_or_else(|| {
                    ConfigurationError::invalid_attribute(name, "version", "expected a positive integer")
                })?,
        };

        let mut field_config = FieldConfig::parse(name, kind, attrs)?;
        field_config.item_type = item_type;

        if kind.is_relation() && field_config.target.is_none() {
            return Err(ConfigurationError::invalid_attribute(
                name,
                "target",
                "required for link fields",
            ));
        }

        let children = if kind.has_children() {
            let items = attrs
                .get("items")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    ConfigurationError::invalid_attribute(name, "items", "required for map fields")
                })?;
            items
                .iter()
                .map(|(child_name, child_spec)| {
                    Field::new(doc_type, child_name, child_spec, default_version)
                })
                .collect::<FieldResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            name: name.into(),
            doc_type: doc_type.into(),
            version,
            kind,
            config: field_config,
            children,
        })
    }

    /// Version-qualified store key: `{name}__v{version}`.
    pub fn physical_key(&self) -> String {
        format!("{}__v{}", self.name, self.version)
    }

    /// Registry identifier: `{doc_type}__{name}__v{version}`.
    pub fn qualified_name(&self) -> String {
        format!("{}__{}__v{}", self.doc_type, self.name, self.version)
    }

    /// The raw type tag this field was declared with.
    pub fn type_tag(&self) -> String {
        match (self.kind, self.config.item_type) {
            (FieldKind::List, Some(item)) => format!("list:{}", item.as_str()),
            _ => self.kind.as_str().to_string(),
        }
    }

    /// Validates one value. Store-dependent checks come pre-fetched in
    /// `external`; this method performs no I/O.
    pub fn validate(
        &self,
        value: &Value,
        document: &Value,
        external: &ExternalResults,
    ) -> ValidationReport {
        match self.kind {
            FieldKind::String => scalar::validate_string(&self.name, value, &self.config, external),
            FieldKind::Number => scalar::validate_number(&self.name, value, &self.config, external),
            FieldKind::Text => scalar::validate_text(&self.name, value, &self.config),
            FieldKind::Check => scalar::validate_check(&self.name, value, &self.config),
            FieldKind::DateTime => temporal::validate(&self.name, value, &self.config),
            FieldKind::Map => nested::validate_map(self, value, document, external),
            FieldKind::MapList => nested::validate_map_list(self, value, document, external),
            FieldKind::List => nested::validate_list(self, value, &self.config),
            FieldKind::Link => relation::validate_link(&self.name, value, &self.config, external),
            FieldKind::Links => relation::validate_links(&self.name, value, &self.config, external),
        }
    }

    /// Index mapping fragment for this field, keyed on physical names.
    pub fn mapping(&self) -> Value {
        match self.kind {
            FieldKind::String => json!({ "type": "keyword" }),
            FieldKind::Number => json!({ "type": "double" }),
            FieldKind::Text => json!({ "type": "text" }),
            FieldKind::Check => json!({ "type": "boolean" }),
            FieldKind::DateTime => json!({ "type": "date", "format": MAPPING_FORMAT }),
            FieldKind::Map => nested::mapping_map(self),
            FieldKind::MapList => nested::mapping_map_list(self),
            FieldKind::List => nested::mapping_list(&self.config),
            FieldKind::Link | FieldKind::Links => relation::relation_mapping(),
        }
    }

    /// Store-facing form of one value.
    pub fn physical_value(&self, value: &Value) -> Value {
        match self.kind {
            FieldKind::DateTime => temporal::physical_value(value, &self.config),
            FieldKind::Map => nested::physical_map(self, value),
            FieldKind::MapList => nested::physical_map_list(self, value),
            FieldKind::Link => relation::physical_link(value),
            FieldKind::Links => relation::physical_links(value),
            _ => value.clone(),
        }
    }

    /// `(physical key, physical value)` for one incoming value.
    pub fn physical_entry(&self, value: &Value) -> (String, Value) {
        (self.physical_key(), self.physical_value(value))
    }

    /// Every (logical, physical) pair this field contributes, nested
    /// children under dotted paths.
    pub fn field_items(&self) -> Vec<FieldItem> {
        let mut items = Vec::new();
        self.collect_items("", &mut items);
        items
    }

    fn collect_items(&self, prefix: &str, out: &mut Vec<FieldItem>) {
        let logical = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", prefix, self.name)
        };
        out.push(FieldItem {
            logical: logical.clone(),
            physical: self.physical_key(),
        });
        for child in &self.children {
            child.collect_items(&logical, out);
        }
    }

    /// This field's own configuration as a physical document fragment.
    pub fn def_physical(&self) -> Value {
        let mut body = Map::new();
        body.insert("type__v1".into(), self.type_tag().into());
        body.insert("version__v1".into(), self.version.into());
        for (attr, value) in self.config.def_attrs() {
            if attr == "item_type" {
                continue; // already encoded in the type tag
            }
            body.insert(format!("{}__v1", attr), value);
        }
        if !self.children.is_empty() {
            let mut items = Map::new();
            for child in &self.children {
                if let Value::Object(child_def) = child.def_physical() {
                    items.extend(child_def);
                }
            }
            body.insert("items__v1".into(), Value::Object(items));
        }
        json!({ self.physical_key(): body })
    }

    /// Mapping fragment for this field's own configuration document.
    pub fn def_mapping(&self) -> Value {
        let Value::Object(def) = self.def_physical() else {
            unreachable!("def_physical always returns an object");
        };
        let body = def
            .get(&self.physical_key())
            .cloned()
            .unwrap_or(Value::Null);
        json!({ self.physical_key(): infer_mapping(&body) })
    }
}

/// Infers a mapping fragment from a definition value's shape.
fn infer_mapping(value: &Value) -> Value {
    match value {
        Value::Bool(_) => json!({ "type": "boolean" }),
        Value::Number(n) if n.is_f64() => json!({ "type": "double" }),
        Value::Number(_) => json!({ "type": "long" }),
        Value::Object(obj) => {
            let properties: Map<String, Value> = obj
                .iter()
                .map(|(k, v)| (k.clone(), infer_mapping(v)))
                .collect();
            json!({ "type": "object", "properties": properties })
        }
        // Strings, arrays of scalars, nulls
        _ => json!({ "type": "keyword" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_attributes_listed() {
        let err = Field::new(
            "user",
            "name",
            &json!({ "type": "string", "min_lenght": 2, "bogus": true }),
            1,
        )
        .unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("bogus"));
        assert!(message.contains("min_lenght"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Field::new("user", "name", &json!({ "type": "varchar" }), 1).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownKind { .. }));
    }

    #[test]
    fn test_list_tag_parametrized() {
        let field = Field::new("user", "scores", &json!({ "type": "list:number" }), 1).unwrap();
        assert_eq!(field.kind, FieldKind::List);
        assert_eq!(field.config.item_type, Some(ScalarKind::Number));
        assert_eq!(field.type_tag(), "list:number");
    }

    #[test]
    fn test_bare_list_tag_rejected() {
        assert!(Field::new("user", "scores", &json!({ "type": "list" }), 1).is_err());
        assert!(Field::new("user", "scores", &json!({ "type": "list:map" }), 1).is_err());
    }

    #[test]
    fn test_link_requires_target() {
        let err = Field::new("book", "author", &json!({ "type": "link" }), 1).unwrap_err();
        assert!(format!("{}", err).contains("target"));
    }

    #[test]
    fn test_version_defaults_and_overrides() {
        let defaulted = Field::new("user", "name", &json!({ "type": "string" }), 1).unwrap();
        assert_eq!(defaulted.version, 1);
        assert_eq!(defaulted.physical_key(), "name__v1");

        let pinned = Field::new("user", "name", &json!({ "type": "string", "version": 3 }), 1).unwrap();
        assert_eq!(pinned.physical_key(), "name__v3");
        assert_eq!(pinned.qualified_name(), "user__name__v3");
    }

    #[test]
    fn test_zero_version_rejected() {
        assert!(Field::new("user", "name", &json!({ "type": "string", "version": 0 }), 1).is_err());
    }

    #[test]
    fn test_field_items_dotted_for_children() {
        let field = Field::new(
            "book",
            "author",
            &json!({
                "type": "map",
                "version": 2,
                "items": { "name": { "type": "string" } }
            }),
            1,
        )
        .unwrap();
        let items = field.field_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].logical, "author");
        assert_eq!(items[0].physical, "author__v2");
        assert_eq!(items[1].logical, "author.name");
        assert_eq!(items[1].physical, "name__v1");
    }

    #[test]
    fn test_def_physical_version_suffixes_config() {
        let field = Field::new(
            "user",
            "name",
            &json!({ "type": "string", "version": 2, "min_length": 2 }),
            1,
        )
        .unwrap();
        let def = field.def_physical();
        let body = &def["name__v2"];
        assert_eq!(body["type__v1"], "string");
        assert_eq!(body["version__v1"], 2);
        assert_eq!(body["min_length__v1"], 2);
    }

    #[test]
    fn test_def_mapping_inferred_from_config_shape() {
        let field = Field::new(
            "user",
            "name",
            &json!({ "type": "string", "min_length": 2, "is_unique": true }),
            1,
        )
        .unwrap();
        let mapping = field.def_mapping();
        let properties = &mapping["name__v1"]["properties"];
        assert_eq!(properties["type__v1"]["type"], "keyword");
        assert_eq!(properties["min_length__v1"]["type"], "long");
        assert_eq!(properties["is_unique__v1"]["type"], "boolean");
    }

    #[test]
    fn test_datetime_mapping_carries_format() {
        let field = Field::new("user", "joined", &json!({ "type": "datetime" }), 1).unwrap();
        assert_eq!(field.mapping()["format"], MAPPING_FORMAT);
    }
}
