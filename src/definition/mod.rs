//! Document definition subsystem for strata
//!
//! Turns a raw declarative schema into everything the store needs to hold
//! documents of that type: an index mapping, a persisted self-describing
//! schema document, and a batch of field version registrations. Also owns
//! the write-time document validation orchestrator, which drives the
//! pattern protocol so that validating a document costs one store round
//! trip regardless of field count.
//!
//! # Phases
//!
//! 1. collect - parse the `_meta` block, normalize sugar, instantiate fields
//! 2. resolve - one batched multi-search for link targets and tag/branch
//! 3. compile - merge mappings, build the schema document, emit the batch

mod compiler;
mod errors;
mod meta;
mod validate;

pub use compiler::{CompiledDefinition, CompileReport, DefinitionCompiler};
pub use errors::{DefinitionError, DefinitionResult};
pub use meta::{MetaBlock, ValidationDecl, ValueRef, META_KEY};
pub use validate::DocumentValidator;
