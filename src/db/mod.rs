//! Database layer for the schema manager
//!
//! A [`DocumentStore`] seam with a MongoDB backend and an in-memory backend,
//! plus the document schemas the manager persists.
//! Pattern adapted from holo-host/rust/util_libs/db

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use schemas::{Metadata, TypeRecord, TYPE_REGISTRY_COLLECTION};
pub use store::{DocumentStore, IndexDefinition, IntoIndexes};
