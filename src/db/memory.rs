//! In-memory document store
//!
//! Mirrors the MongoDB behavior the schema manager relies on (implicit
//! `_id_` index, lazy collection creation, index naming, namespace and key
//! validation) so definitions can be checked without a server.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::{Bson, Document};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::db::store::{DocumentStore, IndexDefinition};
use crate::naming::IDENTITY_INDEX_NAME;
use crate::types::{Result, SchemaError};

#[derive(Debug, Clone)]
struct MemoryCollection {
    documents: Vec<Document>,
    indexes: Vec<IndexDefinition>,
}

impl MemoryCollection {
    fn new() -> Self {
        Self {
            documents: Vec::new(),
            indexes: vec![IndexDefinition {
                name: IDENTITY_INDEX_NAME.to_string(),
                keys: vec!["_id".to_string()],
                unique: true,
            }],
        }
    }
}

/// Document store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, MemoryCollection>,

    /// Number of index creations and drops performed
    index_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        warn!("Document store running in memory-only mode (no MongoDB)");
        Self::default()
    }

    /// Index creations and drops performed since the store was created
    pub fn index_writes(&self) -> usize {
        self.index_writes.load(Ordering::SeqCst)
    }

    fn check_namespace(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(SchemaError::Rejected("Invalid namespace: empty collection name".into()));
        }
        if name.contains('$') || name.contains('\0') {
            return Err(SchemaError::Rejected(format!(
                "Invalid namespace specified '{}'",
                name
            )));
        }
        if name.starts_with("system.") {
            return Err(SchemaError::Rejected(format!(
                "Invalid collection name '{}': system namespaces are reserved",
                name
            )));
        }
        Ok(())
    }

    fn check_key(field: &str) -> Result<()> {
        if field.is_empty() || field.split('.').any(str::is_empty) {
            return Err(SchemaError::Rejected(format!(
                "Index key contains an illegal field name: '{}'",
                field
            )));
        }
        if field.starts_with('$') {
            return Err(SchemaError::Rejected(format!(
                "Index key contains an illegal field name: field name starts with '$': '{}'",
                field
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.iter().map(|c| c.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.contains_key(name))
    }

    async fn ensure_collection(&self, name: &str) -> Result<()> {
        Self::check_namespace(name)?;
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Created collection '{}'", name);
                MemoryCollection::new()
            });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections.remove(name);
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDefinition>> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default())
    }

    async fn create_index(&self, collection: &str, index: &IndexDefinition) -> Result<()> {
        Self::check_namespace(collection)?;
        if index.keys.is_empty() {
            return Err(SchemaError::Rejected("Index keys cannot be empty".into()));
        }
        for field in &index.keys {
            Self::check_key(field)?;
        }

        let mut entry = self
            .collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new);

        if let Some(existing) = entry.indexes.iter().find(|i| i.name == index.name) {
            if existing == index {
                return Ok(());
            }
            return Err(SchemaError::Rejected(format!(
                "Index with name: {} already exists with different options",
                index.name
            )));
        }
        if let Some(existing) = entry.indexes.iter().find(|i| i.keys == index.keys) {
            return Err(SchemaError::Rejected(format!(
                "Index already exists with a different name: {}",
                existing.name
            )));
        }

        entry.indexes.push(index.clone());
        self.index_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        if name == IDENTITY_INDEX_NAME {
            return Err(SchemaError::Rejected("cannot drop _id index".into()));
        }

        if let Some(mut entry) = self.collections.get_mut(collection) {
            let before = entry.indexes.len();
            entry.indexes.retain(|i| i.name != name);
            if entry.indexes.len() != before {
                self.index_writes.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default())
    }

    async fn find_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>> {
        Ok(self.collections.get(collection).and_then(|c| {
            c.documents
                .iter()
                .find(|d| d.get_str(field).ok() == Some(value))
                .cloned()
        }))
    }

    async fn upsert_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        mut document: Document,
    ) -> Result<()> {
        Self::check_namespace(collection)?;
        document.insert(field, Bson::String(value.to_string()));

        let mut entry = self
            .collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new);

        match entry
            .documents
            .iter_mut()
            .find(|d| d.get_str(field).ok() == Some(value))
        {
            Some(existing) => *existing = document,
            None => entry.documents.push(document),
        }
        Ok(())
    }
}
