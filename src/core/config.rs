//! Engine configuration
//!
//! One `EngineConfig` is constructed at process start and threaded by
//! reference into every compiler and projection engine. Nothing in this
//! crate reads configuration from the environment or from globals.

/// Configuration shared by the definition compiler, the projection engine
/// and the field version registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Index holding application documents
    pub index: String,
    /// Index holding engine metadata (field versions, tags, branches,
    /// physical schema documents)
    pub meta_index: String,
    /// Version assumed for a field the registry has never seen
    pub default_version: u32,
    /// Document type under which field version records are persisted
    pub field_version_doc_type: String,
    /// Document type under which tag bindings are persisted
    pub tag_doc_type: String,
    /// Document type under which branch bindings are persisted
    pub branch_doc_type: String,
    /// Document type under which compiled physical schemas are persisted
    pub definition_doc_type: String,
}

impl EngineConfig {
    /// Creates a configuration for the given application index.
    ///
    /// Metadata lives in `<index>_meta` unless overridden.
    pub fn new(index: impl Into<String>) -> Self {
        let index = index.into();
        let meta_index = format!("{}_meta", index);
        Self {
            index,
            meta_index,
            default_version: 1,
            field_version_doc_type: "field_version".into(),
            tag_doc_type: "tag".into(),
            branch_doc_type: "branch".into(),
            definition_doc_type: "definition".into(),
        }
    }

    /// Overrides the metadata index.
    pub fn with_meta_index(mut self, meta_index: impl Into<String>) -> Self {
        self.meta_index = meta_index.into();
        self
    }

    /// Overrides the fallback version used when the registry has no entry.
    pub fn with_default_version(mut self, version: u32) -> Self {
        self.default_version = version;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("strata")
    }
}
