//! Definition Lifecycle
//!
//! End-to-end flow through the compiler, registry, projection engine and
//! validator against the in-memory store:
//! schema -> compile -> register -> resolve -> validate -> write -> read.

use serde_json::json;
use strata::core::{EngineConfig, Identity};
use strata::definition::{DefinitionCompiler, DocumentValidator};
use strata::projection::ProjectionEngine;
use strata::registry::VersionCatalog;
use strata::store::{BulkOp, MemoryStore, StoreClient};

// =============================================================================
// Helper Functions
// =============================================================================

fn user_schema() -> serde_json::Value {
    json!({
        "_meta": {
            "choices": { "status_choices": ["active", "blocked"] },
            "messages": { "email.not_exists": "that address is taken" }
        },
        "email": { "type": "string", "is_unique": true },
        "status": { "type": "string", "choices": "status_choices" },
        "age": { "type": "number", "min_value": 0, "max_value": 150 }
    })
}

fn write_document(store: &MemoryStore, config: &EngineConfig, doc_type: &str, id: &str, body: serde_json::Value) {
    store
        .bulk_write(&[BulkOp::Update {
            index: config.index.clone(),
            doc_type: doc_type.into(),
            id: id.into(),
            body,
        }])
        .unwrap();
    store.refresh(&config.index).unwrap();
}

// =============================================================================
// Full Lifecycle
// =============================================================================

#[test]
fn test_schema_to_document_round_trip() {
    let config = EngineConfig::new("app");
    let store = MemoryStore::new();
    let identity = Identity::anonymous();

    // Compile and register the schema.
    let compiler = DefinitionCompiler::new(&config, &store);
    let compiled = compiler
        .compile(&user_schema(), "user", &identity, None, None)
        .unwrap();
    assert!(compiled.report.is_clean());
    compiler.register(&compiled).unwrap();
    store.refresh(&config.meta_index).unwrap();

    // The registry now answers resolution for the type.
    let catalog = VersionCatalog::load(&store, &config).unwrap();
    assert_eq!(catalog.len(), 3);
    let resolution = catalog.resolution("user", None, &identity).unwrap();

    // Validate, project and persist a document.
    let logical = json!({ "id": "u1", "email": "ada@example.org", "status": "active", "age": 36 });
    let validator = DocumentValidator::new(&config, &store);
    let report = validator.validate(&compiled, &logical, &resolution).unwrap();
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors());

    let engine = ProjectionEngine::new(&config);
    let physical = engine.to_physical(&logical, &resolution).unwrap();
    assert_eq!(physical["email__v1"], "ada@example.org");
    write_document(&store, &config, "user", "u1", physical);

    // Read back and project to logical form.
    let stored = store.get(&config.index, "user", "u1").unwrap();
    let back = engine.to_logical(&stored, None).unwrap();
    assert_eq!(back, logical);
}

#[test]
fn test_uniqueness_enforced_after_write() {
    let config = EngineConfig::new("app");
    let store = MemoryStore::new();
    let identity = Identity::anonymous();

    let compiler = DefinitionCompiler::new(&config, &store);
    let compiled = compiler
        .compile(&user_schema(), "user", &identity, None, None)
        .unwrap();
    compiler.register(&compiled).unwrap();
    store.refresh(&config.meta_index).unwrap();

    let catalog = VersionCatalog::load(&store, &config).unwrap();
    let resolution = catalog.resolution("user", None, &identity).unwrap();
    let engine = ProjectionEngine::new(&config);
    let validator = DocumentValidator::new(&config, &store);

    let first = json!({ "id": "u1", "email": "ada@example.org", "status": "active", "age": 36 });
    let physical = engine.to_physical(&first, &resolution).unwrap();
    write_document(&store, &config, "user", "u1", physical);

    // A second document with the same address fails with the configured
    // message template.
    let second = json!({ "id": "u2", "email": "ada@example.org", "status": "active", "age": 41 });
    let report = validator.validate(&compiled, &second, &resolution).unwrap();
    assert!(!report.is_ok());
    assert_eq!(report.field_errors("email"), ["that address is taken"]);
}

// =============================================================================
// Schema Evolution
// =============================================================================

#[test]
fn test_version_bump_redirects_writes_old_documents_still_read() {
    let config = EngineConfig::new("app");
    let store = MemoryStore::new();
    let identity = Identity::anonymous();
    let engine = ProjectionEngine::new(&config);
    let compiler = DefinitionCompiler::new(&config, &store);

    // First schema generation: email v1.
    let v1_schema = json!({ "email": { "type": "string" } });
    let compiled_v1 = compiler
        .compile(&v1_schema, "user", &identity, None, None)
        .unwrap();
    compiler.register(&compiled_v1).unwrap();
    store.refresh(&config.meta_index).unwrap();

    let catalog = VersionCatalog::load(&store, &config).unwrap();
    let resolution = catalog.resolution("user", None, &identity).unwrap();
    let old_physical = engine
        .to_physical(&json!({ "id": "u1", "email": "ada@example.org" }), &resolution)
        .unwrap();
    assert_eq!(old_physical["email__v1"], "ada@example.org");
    write_document(&store, &config, "user", "u1", old_physical);

    // Second generation migrates email to v2.
    let v2_schema = json!({ "email": { "type": "string", "version": 2 } });
    let compiled_v2 = compiler
        .compile(&v2_schema, "user", &identity, None, None)
        .unwrap();
    compiler.register(&compiled_v2).unwrap();
    store.refresh(&config.meta_index).unwrap();

    let catalog = VersionCatalog::load(&store, &config).unwrap();
    assert_eq!(catalog.len(), 2);
    let resolution = catalog.resolution("user", None, &identity).unwrap();

    // New writes land on v2.
    let new_physical = engine
        .to_physical(&json!({ "id": "u2", "email": "grace@example.org" }), &resolution)
        .unwrap();
    assert_eq!(new_physical["email__v2"], "grace@example.org");

    // Old documents keep reading through their stored version.
    let stored = store.get(&config.index, "user", "u1").unwrap();
    let back = engine.to_logical(&stored, None).unwrap();
    assert_eq!(back["email"], "ada@example.org");
}

// =============================================================================
// Relations
// =============================================================================

#[test]
fn test_linked_definition_resolved_and_substituted() {
    let config = EngineConfig::new("app");
    let store = MemoryStore::new();
    let identity = Identity::anonymous();
    let compiler = DefinitionCompiler::new(&config, &store);

    // Register the target type first.
    let user = compiler
        .compile(&json!({ "name": { "type": "string" } }), "user", &identity, None, None)
        .unwrap();
    compiler.register(&user).unwrap();
    store.refresh(&config.meta_index).unwrap();

    // A post links to a user; the user's mapping is substituted into the
    // link's properties.
    let post_schema = json!({
        "title": { "type": "string" },
        "author": { "type": "link", "target": "user" }
    });
    let post = compiler
        .compile(&post_schema, "post", &identity, None, None)
        .unwrap();
    assert!(post.report.is_clean());
    let author_props = &post.mapping["properties"]["author__v1"]["properties"];
    assert_eq!(author_props["id"]["type"], "keyword");
    assert_eq!(author_props["name__v1"]["type"], "keyword");

    // Definition-driven assembly nests the referenced id as a relation stub.
    let logical = json!({ "id": "p1", "title": "On Mapping", "author": "u1" });
    let physical = post.physical_document(&logical);
    assert_eq!(physical["id"], "p1");
    assert_eq!(physical["title__v1"], "On Mapping");
    assert_eq!(physical["author__v1"], json!({ "id": "u1" }));
}
