//! strata - a versioned document-mapping engine for schemaless search stores
//!
//! Callers read and write documents with plain field names ("logical" form);
//! the store persists every field under an explicit version suffix
//! ("physical" form, `{field}__v{N}`), so field definitions can evolve
//! without breaking stored data.

pub mod core;
pub mod definition;
pub mod field;
pub mod observability;
pub mod patterns;
pub mod projection;
pub mod query;
pub mod registry;
pub mod store;
