//! Document validation orchestrator
//!
//! Field validators never perform I/O. This orchestrator is the
//! caller-side half of that contract: it collects every pattern one
//! document needs (declared validations plus Link/Links existence),
//! rewrites their logical paths into physical form through the same
//! resolution used for projection, issues exactly one multi-search, and
//! feeds the outcomes back into per-field validation.

use serde_json::json;
use serde_json::Value;

use crate::core::EngineConfig;
use crate::field::{FieldKind, ValidationReport};
use crate::observability::{log_event, Event};
use crate::patterns::{ExternalResults, Pattern, PatternBatch};
use crate::registry::VersionMap;
use crate::store::{StoreClient, StoreResult};

use super::compiler::CompiledDefinition;

/// Validates logical documents against a compiled definition.
pub struct DocumentValidator<'a> {
    config: &'a EngineConfig,
    store: &'a dyn StoreClient,
}

impl<'a> DocumentValidator<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a dyn StoreClient) -> Self {
        Self { config, store }
    }

    /// Validates one logical document with at most one store round trip.
    pub fn validate(
        &self,
        definition: &CompiledDefinition,
        doc: &Value,
        resolution: &VersionMap,
    ) -> StoreResult<ValidationReport> {
        let mut report = ValidationReport::passing();
        let Some(obj) = doc.as_object() else {
            report.add_error("_root", "expected a document object");
            return Ok(report);
        };

        let mut batch = PatternBatch::new();

        for decl in &definition.meta.validations {
            let Some(pattern) = decl.pattern(obj.get(&decl.field)) else {
                continue;
            };
            let (target, path) = self.physical_path(&decl.path, &definition.doc_type, resolution);
            batch.add(decl.result_key(), &self.config.index, &target, pattern.with_path(path));
        }

        for field in definition.fields.values() {
            let Some(target) = field.config.target.as_deref() else {
                continue;
            };
            let Some(value) = obj.get(&field.name) else {
                continue;
            };
            match field.kind {
                FieldKind::Link => {
                    if let Some(id) = value.as_str() {
                        batch.add(
                            format!("{}.exists", field.name),
                            &self.config.index,
                            target,
                            Pattern::exists("id", json!(id)),
                        );
                    }
                }
                FieldKind::Links => {
                    if let Some(ids) = value.as_array() {
                        for (i, id) in ids.iter().enumerate() {
                            if let Some(id) = id.as_str() {
                                batch.add(
                                    format!("{}[{}].exists", field.name, i),
                                    &self.config.index,
                                    target,
                                    Pattern::exists("id", json!(id)),
                                );
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let external = if batch.is_empty() {
            ExternalResults::new()
        } else {
            log_event(
                Event::ValidationBatchIssued,
                &[
                    ("doc_type", definition.doc_type.as_str()),
                    ("checks", &batch.len().to_string()),
                ],
            );
            batch.execute(self.store)?
        };

        for field in definition.fields.values() {
            if let Some(value) = obj.get(&field.name) {
                report.merge(field.validate(value, doc, &external));
            }
        }

        if !report.is_ok() {
            log_event(
                Event::ValidationFailed,
                &[("doc_type", definition.doc_type.as_str())],
            );
        }
        Ok(report)
    }

    /// Rewrites a declared logical path (`{doc_type}.{field...}`) into the
    /// physical path the store actually holds, using the projection
    /// resolution when the path targets the definition's own type.
    fn physical_path(
        &self,
        decl_path: &str,
        doc_type: &str,
        resolution: &VersionMap,
    ) -> (String, String) {
        let (target, field_path) = match decl_path.split_once('.') {
            Some((target, rest)) => (target.to_string(), rest),
            None => (doc_type.to_string(), decl_path),
        };

        let own_type = target == resolution.doc_type();
        let mut logical = String::new();
        let mut physical = Vec::new();
        for segment in field_path.split('.') {
            if logical.is_empty() {
                logical.push_str(segment);
            } else {
                logical.push('.');
                logical.push_str(segment);
            }
            let version = if own_type {
                resolution
                    .version_for(&logical, segment)
                    .unwrap_or(self.config.default_version)
            } else {
                self.config.default_version
            };
            physical.push(format!("{}__v{}", segment, version));
        }
        (target, physical.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Identity;
    use crate::definition::DefinitionCompiler;
    use crate::store::MemoryStore;

    fn setup(store: &MemoryStore, config: &EngineConfig) -> (CompiledDefinition, VersionMap) {
        let compiler = DefinitionCompiler::new(config, store);
        let raw = json!({
            "email": { "type": "string", "is_unique": true },
            "name": { "type": "string", "min_length": 2 }
        });
        let compiled = compiler
            .compile(&raw, "user", &Identity::anonymous(), None, None)
            .unwrap();

        let mut resolution = VersionMap::empty("user");
        resolution.insert("email", 1);
        resolution.insert("name", 1);
        (compiled, resolution)
    }

    #[test]
    fn test_unique_violation_detected() {
        let config = EngineConfig::new("app");
        let store = MemoryStore::new();
        store.insert("app", "user", "u1", json!({ "id": "u1", "email__v1": "taken@example.org" }));
        let (definition, resolution) = setup(&store, &config);
        let validator = DocumentValidator::new(&config, &store);

        let report = validator
            .validate(&definition, &json!({ "email": "taken@example.org", "name": "Ada" }), &resolution)
            .unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.field_errors("email").len(), 1);

        let report = validator
            .validate(&definition, &json!({ "email": "free@example.org", "name": "Ada" }), &resolution)
            .unwrap();
        assert!(report.is_ok());
    }

    #[test]
    fn test_local_rules_still_apply() {
        let config = EngineConfig::new("app");
        let store = MemoryStore::new();
        let (definition, resolution) = setup(&store, &config);
        let validator = DocumentValidator::new(&config, &store);

        let report = validator
            .validate(&definition, &json!({ "email": "a@example.org", "name": "x" }), &resolution)
            .unwrap();
        assert!(!report.is_ok());
        assert!(report.field_errors("name")[0].contains("at least 2"));
    }

    #[test]
    fn test_link_existence_checked() {
        let config = EngineConfig::new("app");
        let store = MemoryStore::new();
        store.insert("app", "user", "u1", json!({ "id": "u1", "name__v1": "Ada" }));

        let compiler = DefinitionCompiler::new(&config, &store);
        let raw = json!({
            "title": { "type": "string" },
            "author": { "type": "link", "target": "user" }
        });
        let definition = compiler
            .compile(&raw, "post", &Identity::anonymous(), None, None)
            .unwrap();
        let resolution = VersionMap::empty("post");
        let validator = DocumentValidator::new(&config, &store);

        let report = validator
            .validate(&definition, &json!({ "title": "t", "author": "u1" }), &resolution)
            .unwrap();
        assert!(report.is_ok());

        let report = validator
            .validate(&definition, &json!({ "title": "t", "author": "ghost" }), &resolution)
            .unwrap();
        assert!(!report.is_ok());
        assert!(report.field_errors("author")[0].contains("ghost"));
    }

    #[test]
    fn test_no_patterns_no_io() {
        let config = EngineConfig::new("app");
        let store = MemoryStore::new();
        let compiler = DefinitionCompiler::new(&config, &store);
        let definition = compiler
            .compile(
                &json!({ "name": { "type": "string" } }),
                "user",
                &Identity::anonymous(),
                None,
                None,
            )
            .unwrap();
        let resolution = VersionMap::empty("user");
        let validator = DocumentValidator::new(&config, &store);

        // No declared validations, no links: purely local validation.
        let report = validator
            .validate(&definition, &json!({ "name": "Ada" }), &resolution)
            .unwrap();
        assert!(report.is_ok());
    }

    #[test]
    fn test_pattern_path_rewritten_to_physical() {
        let config = EngineConfig::new("app");
        let store = MemoryStore::new();
        // The store holds the taken email under version 2.
        store.insert("app", "user", "u1", json!({ "id": "u1", "email__v2": "taken@example.org" }));

        let compiler = DefinitionCompiler::new(&config, &store);
        let raw = json!({ "email": { "type": "string", "is_unique": true, "version": 2 } });
        let definition = compiler
            .compile(&raw, "user", &Identity::anonymous(), None, None)
            .unwrap();

        let mut resolution = VersionMap::empty("user");
        resolution.insert("email", 2);
        let validator = DocumentValidator::new(&config, &store);

        let report = validator
            .validate(&definition, &json!({ "email": "taken@example.org" }), &resolution)
            .unwrap();
        assert!(!report.is_ok());
    }
}
