//! Content Types - schema manager for content unit collections
//!
//! Content units of each type live in their own MongoDB collection. This
//! crate takes declarative [`TypeDefinition`]s (identity plus unique and
//! search index specs) and converges the store to them:
//!
//! - **Naming**: `units_<type id>` collections, default MongoDB index names
//! - **Index synchronizer**: per-collection index delta, idempotent
//! - **Type registry**: one record per applied type in `content_types`
//! - **Types database**: batch update with failure aggregation and
//!   missing-definition detection
//!
//! # Usage
//!
//! ```ignore
//! let store = Arc::new(MongoStore::new("mongodb://localhost:27017", "content").await?);
//! let types_db = TypesDatabase::new(store);
//!
//! types_db.update(&definitions, false).await?;
//! let collections = types_db.all_type_collection_names().await?;
//! ```

pub mod config;
pub mod database;
pub mod db;
pub mod model;
pub mod naming;
pub mod registry;
pub mod sync;
pub mod types;

pub use config::Args;
pub use database::{DefinitionOutcome, TypesDatabase, UpdateSummary};
pub use db::{DocumentStore, MemoryStore, MongoStore};
pub use model::{IndexSpec, TypeDefinition};
pub use naming::unit_collection_name;
pub use types::{Result, SchemaError};
