//! Store client subsystem for strata
//!
//! The engine never owns storage. Every persistent byte lives in a remote
//! search/index store reached through the `StoreClient` trait; this module
//! defines that contract plus an in-memory implementation used by tests and
//! local provisioning.
//!
//! # Contract
//!
//! - All calls are synchronous request/response with JSON payloads
//! - Responses come back in request order for `multi_search`
//! - No retries at this layer; a failed call surfaces as `StoreError`
//! - The store is eventually consistent: a write is not visible to a
//!   subsequent read until `refresh` has completed

mod client;
mod errors;
mod memory;

pub use client::{BulkAck, BulkOp, MultiSearchItem, SearchResponse, StoreClient};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
