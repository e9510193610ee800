//! Document store abstraction
//!
//! The schema manager only needs collection lifecycle, index management and
//! whole-document reads/upserts. Both backends follow MongoDB semantics:
//! every collection carries an `_id_` index, indexes are named by
//! [`index_entry_name`](crate::naming::index_entry_name) unless told
//! otherwise, and dropping something that does not exist is not an error.

use async_trait::async_trait;
use bson::Document;

use crate::naming::{index_entry_name, IDENTITY_INDEX_NAME};
use crate::types::Result;

/// An index as declared to, or reported by, the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name; defaults to the store's name for the key sequence
    pub name: String,

    /// Ordered field names, all ascending
    pub keys: Vec<String>,

    pub unique: bool,
}

impl IndexDefinition {
    /// Ascending index over `keys` with the default name
    pub fn new(keys: Vec<String>, unique: bool) -> Self {
        Self {
            name: index_entry_name(&keys),
            keys,
            unique,
        }
    }

    /// Whether this is the implicit `_id` index
    pub fn is_identity(&self) -> bool {
        self.name == IDENTITY_INDEX_NAME
    }
}

/// Trait for schemas that declare their own indexes
pub trait IntoIndexes {
    fn into_indices() -> Vec<IndexDefinition>;
}

/// Storage operations used by the schema manager
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of every collection in the database
    async fn list_collection_names(&self) -> Result<Vec<String>>;

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_collection_names().await?.iter().any(|n| n == name))
    }

    /// Create an empty collection; an existing collection is left alone
    async fn ensure_collection(&self, name: &str) -> Result<()>;

    /// Drop a collection and its indexes; missing collections are ignored
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Every index on a collection, `_id_` included; empty if the collection is absent
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDefinition>>;

    async fn create_index(&self, collection: &str, index: &IndexDefinition) -> Result<()>;

    /// Drop an index by name; missing indexes are ignored
    async fn drop_index(&self, collection: &str, name: &str) -> Result<()>;

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Find the first document whose `field` equals `value`
    async fn find_by(&self, collection: &str, field: &str, value: &str)
        -> Result<Option<Document>>;

    /// Replace the document whose `field` equals `value`, inserting it if absent
    async fn upsert_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        document: Document,
    ) -> Result<()>;
}
