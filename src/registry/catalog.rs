//! Version catalogue
//!
//! In-memory view of the registry plus its store persistence. The
//! catalogue answers one question for the projection engine: which version
//! does each logical field of a document type currently map to. That
//! answer (`VersionMap`) is built from exactly one pass over the entries,
//! so a caller holding a catalogue pays one store query per document
//! projection at most.

use std::collections::BTreeMap;

use serde_json::json;

use crate::core::{EngineConfig, Identity};
use crate::observability::{log_event, Event};
use crate::store::{BulkAck, BulkOp, StoreClient, StoreResult};

use super::errors::{RegistryError, RegistryResult};
use super::types::{FieldVersion, SchemaTag};

/// Upper bound on registry records fetched in one load.
const LOAD_SIZE: u64 = 10_000;

/// Resolved logical-path -> version map for one document type.
///
/// Produced by `VersionCatalog::resolution`; consumed by
/// `ProjectionEngine::to_physical`. Nested fields resolve by full dotted
/// path first, then by bare leaf name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMap {
    doc_type: String,
    versions: BTreeMap<String, u32>,
}

impl VersionMap {
    /// An empty map; every lookup falls back to the engine default.
    pub fn empty(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            versions: BTreeMap::new(),
        }
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn insert(&mut self, path: impl Into<String>, version: u32) {
        self.versions.insert(path.into(), version);
    }

    /// Version for a field at the given dotted path, trying the full path
    /// before the bare name.
    pub fn version_for(&self, path: &str, name: &str) -> Option<u32> {
        self.versions
            .get(path)
            .or_else(|| self.versions.get(name))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Append-only catalogue of field version records.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    entries: Vec<FieldVersion>,
}

impl VersionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = FieldVersion>) -> Self {
        let mut catalog = Self::new();
        catalog.register(entries);
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FieldVersion] {
        &self.entries
    }

    /// Appends new records, skipping combinations already present.
    ///
    /// Returns the number of records actually added.
    pub fn register(&mut self, batch: impl IntoIterator<Item = FieldVersion>) -> usize {
        let mut added = 0;
        for record in batch {
            let exists = self.entries.iter().any(|e| {
                e.doc_type == record.doc_type
                    && e.field_name == record.field_name
                    && e.version == record.version
            });
            if !exists {
                self.entries.push(record);
                added += 1;
            }
        }
        added
    }

    /// Flips one record inactive. Returns false when no such record exists.
    pub fn deactivate(&mut self, doc_type: &str, field_name: &str, version: u32) -> bool {
        for entry in &mut self.entries {
            if entry.doc_type == doc_type
                && entry.field_name == field_name
                && entry.version == version
            {
                entry.is_active = false;
                log_event(
                    Event::FieldVersionDeactivated,
                    &[("record", &entry.qualified_name())],
                );
                return true;
            }
        }
        false
    }

    /// Active records for one document type.
    pub fn active<'a>(&'a self, doc_type: &'a str) -> impl Iterator<Item = &'a FieldVersion> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.doc_type == doc_type && e.is_active)
    }

    /// Builds the logical -> version resolution for one document type.
    ///
    /// Untagged: the maximum active version per field path. Tagged: exactly
    /// the versions the binding pins, after a visibility check against the
    /// caller's identity.
    pub fn resolution(
        &self,
        doc_type: &str,
        tag: Option<&SchemaTag>,
        identity: &Identity,
    ) -> RegistryResult<VersionMap> {
        let mut map = VersionMap::empty(doc_type);

        match tag {
            None => {
                for entry in self.active(doc_type) {
                    let current = map.versions.entry(entry.field_name.clone()).or_insert(0);
                    if entry.version > *current {
                        *current = entry.version;
                    }
                }
            }
            Some(tag) => {
                if !tag.visible_to(identity) {
                    return Err(RegistryError::TagNotVisible {
                        slug: tag.slug.clone(),
                    });
                }
                if tag.doc_type != doc_type {
                    return Err(RegistryError::WrongDocType {
                        slug: tag.slug.clone(),
                        expected: doc_type.into(),
                        actual: tag.doc_type.clone(),
                    });
                }
                let active: std::collections::BTreeSet<String> =
                    self.active(doc_type).map(|e| e.qualified_name()).collect();
                for identifier in &tag.field_versions {
                    if !active.contains(identifier) {
                        return Err(RegistryError::MissingVersion {
                            identifier: identifier.clone(),
                        });
                    }
                }
                for entry in self.active(doc_type) {
                    if !tag.contains(&entry.qualified_name()) {
                        continue;
                    }
                    if map.versions.contains_key(&entry.field_name) {
                        return Err(RegistryError::AmbiguousBinding {
                            field: entry.field_name.clone(),
                        });
                    }
                    map.insert(entry.field_name.clone(), entry.version);
                }
            }
        }
        Ok(map)
    }

    /// The qualified identifiers currently active for a document type.
    pub fn active_identifiers(&self, doc_type: &str) -> Vec<String> {
        self.active(doc_type).map(|e| e.qualified_name()).collect()
    }

    /// Loads the full catalogue from the store in one query.
    pub fn load(client: &dyn StoreClient, config: &EngineConfig) -> RegistryResult<Self> {
        let query = json!({ "query": { "match_all": {} }, "size": LOAD_SIZE });
        let response = client.search(&config.meta_index, &config.field_version_doc_type, &query)?;

        let mut entries = Vec::with_capacity(response.hits.len());
        for hit in &response.hits {
            let record: FieldVersion = serde_json::from_value(hit.clone())
                .map_err(|e| RegistryError::MalformedRecord(e.to_string()))?;
            entries.push(record);
        }
        let catalog = Self::from_entries(entries);
        log_event(Event::RegistryLoaded, &[("entries", &catalog.len().to_string())]);
        Ok(catalog)
    }

    /// Persists every record as a create; existing records are left
    /// untouched (the registry is append-only).
    pub fn persist(
        &self,
        client: &dyn StoreClient,
        config: &EngineConfig,
    ) -> StoreResult<Vec<BulkAck>> {
        let ops: Vec<BulkOp> = self
            .entries
            .iter()
            .map(|entry| BulkOp::Create {
                index: config.meta_index.clone(),
                doc_type: config.field_version_doc_type.clone(),
                id: entry.qualified_name(),
                body: serde_json::to_value(entry).unwrap_or_default(),
            })
            .collect();
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let acks = client.bulk_write(&ops)?;
        log_event(Event::RegistryPersisted, &[("records", &acks.len().to_string())]);
        Ok(acks)
    }
}
