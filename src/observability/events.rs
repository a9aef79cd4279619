//! Observability events
//!
//! The observable lifecycle of the mapping engine. Events are explicit
//! and typed; free-form event names are reserved for tests.

use std::fmt;

/// Observable engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Definition compilation
    /// Compilation of a raw schema started
    DefinitionCompileStart,
    /// Compilation produced mapping, physical schema and version batch
    DefinitionCompileComplete,
    /// Compilation finished with per-field issues recorded
    DefinitionCompileDegraded,

    // Registry
    /// Field version catalogue loaded from the store
    RegistryLoaded,
    /// Field version batch persisted to the store
    RegistryPersisted,
    /// A field version was deactivated
    FieldVersionDeactivated,

    // Validation
    /// A validation batch was issued against the store
    ValidationBatchIssued,
    /// Document validation finished with errors
    ValidationFailed,
}

impl Event {
    /// Returns the event name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DefinitionCompileStart => "DEFINITION_COMPILE_START",
            Event::DefinitionCompileComplete => "DEFINITION_COMPILE_COMPLETE",
            Event::DefinitionCompileDegraded => "DEFINITION_COMPILE_DEGRADED",
            Event::RegistryLoaded => "REGISTRY_LOADED",
            Event::RegistryPersisted => "REGISTRY_PERSISTED",
            Event::FieldVersionDeactivated => "FIELD_VERSION_DEACTIVATED",
            Event::ValidationBatchIssued => "VALIDATION_BATCH_ISSUED",
            Event::ValidationFailed => "VALIDATION_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
