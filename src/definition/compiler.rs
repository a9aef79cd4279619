//! Definition compiler
//!
//! collect -> resolve -> compile. The resolve phase is the one store
//! round trip of a compile: every Link/Links target definition lookup and
//! the optional tag/branch lookup travel in a single multi-search.
//!
//! Per-field failures (bad configuration, unresolved link targets) land in
//! the compile report and the remaining fields still compile; a caller
//! reviews a whole schema's issues at once.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::core::{EngineConfig, Identity};
use crate::field::Field;
use crate::observability::{log_event, Event};
use crate::projection::ID_KEY;
use crate::registry::FieldVersion;
use crate::store::{BulkOp, MultiSearchItem, StoreClient};

use super::errors::{DefinitionError, DefinitionResult};
use super::meta::{MetaBlock, META_KEY};

/// Per-field issues recorded during a compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    field_issues: BTreeMap<String, Vec<String>>,
    /// Fields whose Link/Links target had no registered definition
    pub missing_links: Vec<String>,
}

impl CompileReport {
    pub fn add_issue(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_issues
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn issues(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_issues
    }

    pub fn is_clean(&self) -> bool {
        self.field_issues.is_empty() && self.missing_links.is_empty()
    }
}

/// Everything a compile produces for one document type.
#[derive(Debug, Clone)]
pub struct CompiledDefinition {
    pub doc_type: String,
    pub identity: Identity,
    pub tag: Option<String>,
    pub branch: Option<String>,
    /// Field name -> configured instance
    pub fields: BTreeMap<String, Field>,
    pub meta: MetaBlock,
    /// Cache of related documents fetched during resolve, keyed
    /// `link:{field}` / `tag:{slug}` / `branch:{slug}`
    pub related: BTreeMap<String, Value>,
    /// Index mapping, physical keys throughout
    pub mapping: Value,
    /// Self-describing schema document persisted to the store
    pub physical_schema: Value,
    /// One registration per declared field, nested children included
    pub version_batch: Vec<FieldVersion>,
    pub report: CompileReport,
}

impl CompiledDefinition {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Assembles the store-facing document for one logical document using
    /// each field's physical projection: relation stubs for links, auto
    /// values for generated timestamps, version-qualified keys throughout.
    pub fn physical_document(&self, logical: &Value) -> Value {
        let mut out = Map::new();
        let Some(obj) = logical.as_object() else {
            return Value::Object(out);
        };
        if let Some(id) = obj.get(ID_KEY) {
            out.insert(ID_KEY.into(), id.clone());
        }
        for field in self.fields.values() {
            match obj.get(&field.name) {
                Some(value) => {
                    let (key, physical) = field.physical_entry(value);
                    out.insert(key, physical);
                }
                None => {
                    // Auto-generated timestamps materialize even when the
                    // caller sends nothing.
                    if field.config.is_create_date || field.config.is_timestamp {
                        let (key, physical) = field.physical_entry(&Value::Null);
                        out.insert(key, physical);
                    }
                }
            }
        }
        Value::Object(out)
    }
}

/// Compiles raw schemas against one configuration and store.
pub struct DefinitionCompiler<'a> {
    config: &'a EngineConfig,
    store: &'a dyn StoreClient,
}

impl<'a> DefinitionCompiler<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a dyn StoreClient) -> Self {
        Self { config, store }
    }

    /// Runs all three phases for one raw schema.
    pub fn compile(
        &self,
        raw: &Value,
        doc_type: &str,
        identity: &Identity,
        tag: Option<&str>,
        branch: Option<&str>,
    ) -> DefinitionResult<CompiledDefinition> {
        log_event(Event::DefinitionCompileStart, &[("doc_type", doc_type)]);

        let raw_obj = raw
            .as_object()
            .ok_or(DefinitionError::SchemaNotAnObject {
                actual: json_type_name(raw),
            })?;
        if !raw_obj.keys().any(|key| key != META_KEY) {
            return Err(DefinitionError::NoFields {
                doc_type: doc_type.into(),
            });
        }

        let meta = MetaBlock::collect(raw_obj, doc_type)?;
        let mut report = CompileReport::default();

        // collect
        let mut fields: BTreeMap<String, Field> = BTreeMap::new();
        for (name, spec) in raw_obj {
            if name == META_KEY {
                continue;
            }
            let attrs = prepare_attrs(name, spec, &meta);
            match Field::new(doc_type, name, &attrs, self.config.default_version) {
                Ok(field) => {
                    fields.insert(name.clone(), field);
                }
                Err(err) => report.add_issue(name, err.to_string()),
            }
        }

        // resolve
        let related = self.resolve(&fields, tag, branch, &mut report)?;

        // compile
        let mapping = self.build_mapping(&fields, &related);
        let physical_schema = build_physical_schema(doc_type, &fields, &mapping);
        let version_batch = build_version_batch(&fields, tag, branch, identity);

        let event = if report.is_clean() {
            Event::DefinitionCompileComplete
        } else {
            Event::DefinitionCompileDegraded
        };
        log_event(
            event,
            &[
                ("doc_type", doc_type),
                ("fields", &fields.len().to_string()),
                ("registrations", &version_batch.len().to_string()),
            ],
        );

        Ok(CompiledDefinition {
            doc_type: doc_type.into(),
            identity: identity.clone(),
            tag: tag.map(Into::into),
            branch: branch.map(Into::into),
            fields,
            meta,
            related,
            mapping,
            physical_schema,
            version_batch,
            report,
        })
    }

    /// The single batched multi-search of a compile: one sub-query per
    /// Link/Links target plus one for the tag and one for the branch.
    fn resolve(
        &self,
        fields: &BTreeMap<String, Field>,
        tag: Option<&str>,
        branch: Option<&str>,
        report: &mut CompileReport,
    ) -> DefinitionResult<BTreeMap<String, Value>> {
        let mut keys: Vec<String> = Vec::new();
        let mut items: Vec<MultiSearchItem> = Vec::new();

        for field in fields.values() {
            if !field.kind.is_relation() {
                continue;
            }
            let Some(target) = field.config.target.as_deref() else {
                continue;
            };
            keys.push(format!("link:{}", field.name));
            items.push(MultiSearchItem::new(
                &self.config.meta_index,
                &self.config.definition_doc_type,
                json!({ "query": { "term": { "doc_type": target } }, "size": 1 }),
            ));
        }
        if let Some(slug) = tag {
            keys.push(format!("tag:{}", slug));
            items.push(MultiSearchItem::new(
                &self.config.meta_index,
                &self.config.tag_doc_type,
                json!({ "query": { "term": { "slug": slug } }, "size": 1 }),
            ));
        }
        if let Some(slug) = branch {
            keys.push(format!("branch:{}", slug));
            items.push(MultiSearchItem::new(
                &self.config.meta_index,
                &self.config.branch_doc_type,
                json!({ "query": { "term": { "slug": slug } }, "size": 1 }),
            ));
        }

        let mut related = BTreeMap::new();
        if items.is_empty() {
            return Ok(related);
        }

        let responses = self.store.multi_search(&items)?;
        for (key, response) in keys.iter().zip(responses.iter()) {
            let source = response["hits"]["hits"]
                .get(0)
                .and_then(|hit| hit.get("_source"))
                .cloned();
            match source {
                Some(doc) => {
                    related.insert(key.clone(), doc);
                }
                None => {
                    if let Some(field) = key.strip_prefix("link:") {
                        report.add_issue(
                            field,
                            "linked document type has no registered definition",
                        );
                        report.missing_links.push(field.to_string());
                    } else {
                        report.add_issue(META_KEY, format!("unresolved reference '{}'", key));
                    }
                }
            }
        }
        Ok(related)
    }

    /// Merges every field's mapping fragment, substituting resolved remote
    /// document mappings into Link/Links properties.
    fn build_mapping(
        &self,
        fields: &BTreeMap<String, Field>,
        related: &BTreeMap<String, Value>,
    ) -> Value {
        let mut properties = Map::new();
        properties.insert("id".into(), json!({ "type": "keyword" }));

        for field in fields.values() {
            let mut fragment = field.mapping();
            if field.kind.is_relation() {
                let remote = related
                    .get(&format!("link:{}", field.name))
                    .and_then(|doc| doc["mapping"]["properties"].as_object());
                if let (Some(remote), Some(props)) = (
                    remote,
                    fragment
                        .get_mut("properties")
                        .and_then(Value::as_object_mut),
                ) {
                    for (key, value) in remote {
                        props.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
            properties.insert(field.physical_key(), fragment);
        }
        json!({ "properties": properties })
    }

    /// Persists the compiled artifacts: the definition document plus every
    /// field version record, in one bulk write.
    ///
    /// The definition document is replaced (a recompile refreshes it);
    /// version records are created only, the registry being append-only.
    pub fn register(&self, compiled: &CompiledDefinition) -> DefinitionResult<()> {
        let mut ops = vec![BulkOp::Update {
            index: self.config.meta_index.clone(),
            doc_type: self.config.definition_doc_type.clone(),
            id: compiled.doc_type.clone(),
            body: compiled.physical_schema.clone(),
        }];
        for record in &compiled.version_batch {
            ops.push(BulkOp::Create {
                index: self.config.meta_index.clone(),
                doc_type: self.config.field_version_doc_type.clone(),
                id: record.qualified_name(),
                body: serde_json::to_value(record).unwrap_or_default(),
            });
        }
        self.store.bulk_write(&ops)?;
        log_event(
            Event::RegistryPersisted,
            &[
                ("doc_type", &compiled.doc_type),
                ("records", &compiled.version_batch.len().to_string()),
            ],
        );
        Ok(())
    }
}

/// Normalizes one field's raw attributes against the meta block:
/// named choice sets are replaced by their values, message templates are
/// merged in, and declared validations surface in the field's list.
fn prepare_attrs(name: &str, spec: &Value, meta: &MetaBlock) -> Value {
    let Some(obj) = spec.as_object() else {
        return spec.clone();
    };
    let mut attrs = obj.clone();

    let resolved_choices = match attrs.get("choices") {
        Some(Value::String(reference)) => meta
            .choices
            .get(reference)
            .map(|set| Value::Array(set.clone())),
        _ => None,
    };
    if let Some(resolved) = resolved_choices {
        attrs.insert("choices".into(), resolved);
    }

    let templates = meta.messages_for(name);
    if !templates.is_empty() {
        let mut messages = attrs
            .get("messages")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (rule, template) in templates {
            messages.entry(rule).or_insert_with(|| template.into());
        }
        attrs.insert("messages".into(), Value::Object(messages));
    }

    // Declared validations only apply to kinds that consult external
    // results; injecting elsewhere would trip the whitelist.
    let externally_validated = matches!(
        attrs.get("type").and_then(Value::as_str),
        Some("string") | Some("number")
    );
    if externally_validated {
        let mut validations: Vec<Value> = attrs
            .get("validations")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for decl in meta.validations_for(name) {
            let name_value = Value::from(decl.validation_type());
            if !validations.contains(&name_value) {
                validations.push(name_value);
            }
        }
        if !validations.is_empty() {
            attrs.insert("validations".into(), Value::Array(validations));
        }
    }

    Value::Object(attrs)
}

fn build_physical_schema(doc_type: &str, fields: &BTreeMap<String, Field>, mapping: &Value) -> Value {
    let mut schema = Map::new();
    for field in fields.values() {
        if let Value::Object(def) = field.def_physical() {
            schema.extend(def);
        }
    }
    json!({
        "id": doc_type,
        "doc_type": doc_type,
        "schema": schema,
        "mapping": mapping
    })
}

fn build_version_batch(
    fields: &BTreeMap<String, Field>,
    tag: Option<&str>,
    branch: Option<&str>,
    identity: &Identity,
) -> Vec<FieldVersion> {
    let mut batch = Vec::new();
    for field in fields.values() {
        collect_version_records(field, "", tag, branch, identity, &mut batch);
    }
    batch
}

fn collect_version_records(
    field: &Field,
    prefix: &str,
    tag: Option<&str>,
    branch: Option<&str>,
    identity: &Identity,
    out: &mut Vec<FieldVersion>,
) {
    let logical = if prefix.is_empty() {
        field.name.clone()
    } else {
        format!("{}.{}", prefix, field.name)
    };
    out.push(
        FieldVersion::new(&field.doc_type, &logical, field.version, field.kind)
            .with_tag(tag.map(Into::into))
            .with_branch(branch.map(Into::into))
            .created_by(identity.user_id),
    );
    for child in &field.children {
        collect_version_records(child, &logical, tag, branch, identity, out);
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
