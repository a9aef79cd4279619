//! The `_meta` block
//!
//! A raw schema's meta block declares named choice sets, message templates
//! and store-dependent validations:
//!
//! ```json
//! {
//!   "_meta": {
//!     "choices": { "status_choices": ["draft", "live"] },
//!     "messages": { "email.not_exists": "that address is taken" },
//!     "validations": {
//!       "email": [ { "type": "not_exists", "path": "user.email", "value": "self" } ]
//!     }
//!   },
//!   "email": { "type": "string", "is_unique": true }
//! }
//! ```
//!
//! `is_unique: true` on a field is sugar for a not-exists validation bound
//! to `path = {doc_type}.{field}`, `value = self`; collection normalizes it
//! into the same declaration form.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::patterns::Pattern;

use super::errors::{DefinitionError, DefinitionResult};

/// Reserved key holding the meta block.
pub const META_KEY: &str = "_meta";

/// The value side of a validation declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef {
    /// The document's own value for the declaring field
    SelfValue,
    /// A fixed literal
    Literal(Value),
}

/// One declared store-dependent validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDecl {
    /// Declaring field
    pub field: String,
    /// True for exists, false for not-exists
    pub must_exist: bool,
    /// Dotted logical path the lookup is keyed on (`{doc_type}.{field}`)
    pub path: String,
    pub value: ValueRef,
}

impl ValidationDecl {
    /// Validation type name; doubles as the `ExternalResults` key suffix.
    pub fn validation_type(&self) -> &'static str {
        if self.must_exist {
            "exists"
        } else {
            "not_exists"
        }
    }

    /// Result key this declaration reports under.
    pub fn result_key(&self) -> String {
        format!("{}.{}", self.field, self.validation_type())
    }

    /// Builds the pattern for one document, resolving `self` against the
    /// declaring field's value. Returns `None` when the document carries no
    /// value to check.
    pub fn pattern(&self, doc_value: Option<&Value>) -> Option<Pattern> {
        let value = match &self.value {
            ValueRef::Literal(value) => value.clone(),
            ValueRef::SelfValue => doc_value?.clone(),
        };
        Some(if self.must_exist {
            Pattern::exists(&self.path, value)
        } else {
            Pattern::not_exists(&self.path, value)
        })
    }
}

/// Parsed meta block plus normalized sugar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaBlock {
    /// Named choice sets fields may reference
    pub choices: BTreeMap<String, Vec<Value>>,
    /// Message templates keyed `{field}.{rule}`
    pub messages: BTreeMap<String, String>,
    /// Store-dependent validation declarations
    pub validations: Vec<ValidationDecl>,
}

impl MetaBlock {
    /// Parses the meta block out of a raw schema and folds in the
    /// `is_unique` sugar found on field specifications.
    pub fn collect(raw: &Map<String, Value>, doc_type: &str) -> DefinitionResult<Self> {
        let mut block = MetaBlock::default();

        if let Some(meta) = raw.get(META_KEY) {
            let meta = meta
                .as_object()
                .ok_or_else(|| DefinitionError::MalformedMeta("expected an object".into()))?;
            block.parse_choices(meta)?;
            block.parse_messages(meta)?;
            block.parse_validations(meta)?;
        }

        // is_unique sugar on field specs.
        for (field, spec) in raw {
            if field == META_KEY {
                continue;
            }
            let is_unique = spec
                .get("is_unique")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if is_unique {
                block.validations.push(ValidationDecl {
                    field: field.clone(),
                    must_exist: false,
                    path: format!("{}.{}", doc_type, field),
                    value: ValueRef::SelfValue,
                });
            }
        }

        Ok(block)
    }

    fn parse_choices(&mut self, meta: &Map<String, Value>) -> DefinitionResult<()> {
        let Some(choices) = meta.get("choices") else {
            return Ok(());
        };
        let choices = choices
            .as_object()
            .ok_or_else(|| DefinitionError::MalformedMeta("choices must be an object".into()))?;
        for (name, set) in choices {
            let set = set.as_array().ok_or_else(|| {
                DefinitionError::MalformedMeta(format!("choice set '{}' must be an array", name))
            })?;
            self.choices.insert(name.clone(), set.clone());
        }
        Ok(())
    }

    fn parse_messages(&mut self, meta: &Map<String, Value>) -> DefinitionResult<()> {
        let Some(messages) = meta.get("messages") else {
            return Ok(());
        };
        let messages = messages
            .as_object()
            .ok_or_else(|| DefinitionError::MalformedMeta("messages must be an object".into()))?;
        for (key, template) in messages {
            let template = template.as_str().ok_or_else(|| {
                DefinitionError::MalformedMeta(format!("message '{}' must be a string", key))
            })?;
            self.messages.insert(key.clone(), template.into());
        }
        Ok(())
    }

    fn parse_validations(&mut self, meta: &Map<String, Value>) -> DefinitionResult<()> {
        let Some(validations) = meta.get("validations") else {
            return Ok(());
        };
        let validations = validations
            .as_object()
            .ok_or_else(|| DefinitionError::MalformedMeta("validations must be an object".into()))?;

        for (field, decls) in validations {
            let decls = decls.as_array().ok_or_else(|| {
                DefinitionError::MalformedMeta(format!(
                    "validations for '{}' must be an array",
                    field
                ))
            })?;
            for decl in decls {
                self.validations.push(parse_decl(field, decl)?);
            }
        }
        Ok(())
    }

    /// Declarations bound to one field.
    pub fn validations_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a ValidationDecl> + 'a {
        self.validations.iter().filter(move |d| d.field == field)
    }

    /// Message templates for one field, keyed by rule.
    pub fn messages_for(&self, field: &str) -> BTreeMap<String, String> {
        let prefix = format!("{}.", field);
        self.messages
            .iter()
            .filter_map(|(key, template)| {
                key.strip_prefix(&prefix)
                    .map(|rule| (rule.to_string(), template.clone()))
            })
            .collect()
    }
}

fn parse_decl(field: &str, decl: &Value) -> DefinitionResult<ValidationDecl> {
    let obj = decl.as_object().ok_or_else(|| {
        DefinitionError::MalformedMeta(format!("validation for '{}' must be an object", field))
    })?;

    let must_exist = match obj.get("type").and_then(Value::as_str) {
        Some("exists") => true,
        Some("not_exists") => false,
        other => {
            return Err(DefinitionError::MalformedMeta(format!(
                "validation for '{}' has unsupported type {:?}",
                field, other
            )))
        }
    };

    let path = obj
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DefinitionError::MalformedMeta(format!("validation for '{}' is missing a path", field))
        })?
        .to_string();

    let value = match obj.get("value") {
        None => ValueRef::SelfValue,
        Some(Value::String(s)) if s == "self" => ValueRef::SelfValue,
        Some(other) => ValueRef::Literal(other.clone()),
    };

    Ok(ValidationDecl {
        field: field.into(),
        must_exist,
        path,
        value,
    })
}
