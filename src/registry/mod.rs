//! Field version registry for strata
//!
//! The append-only catalogue of every (document type, field, version)
//! combination ever registered. Records are never deleted; retiring a
//! version flips its `is_active` flag. The projection engine and the
//! definition compiler read the catalogue to decide which physical key a
//! logical field maps to; nothing in this crate ever rewrites a record.

mod catalog;
mod errors;
mod types;

pub use catalog::{VersionCatalog, VersionMap};
pub use errors::{RegistryError, RegistryResult};
pub use types::{FieldVersion, SchemaTag};
