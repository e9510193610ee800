//! Type registry
//!
//! The durable list of content types that have been applied, one
//! [`TypeRecord`] per type id in a single well-known collection. Unit
//! collections are addressed separately, so checking whether a type exists
//! never requires loading its unit collection and vice versa.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::db::{DocumentStore, IntoIndexes, TypeRecord, TYPE_REGISTRY_COLLECTION};
use crate::types::{Result, SchemaError};

pub struct TypeRegistry {
    store: Arc<dyn DocumentStore>,
}

impl TypeRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the registry collection and its indexes if missing
    pub async fn ensure(&self) -> Result<()> {
        self.store.ensure_collection(TYPE_REGISTRY_COLLECTION).await?;
        for index in TypeRecord::into_indices() {
            self.store
                .create_index(TYPE_REGISTRY_COLLECTION, &index)
                .await?;
        }
        Ok(())
    }

    pub async fn all_records(&self) -> Result<Vec<TypeRecord>> {
        self.store
            .find_all(TYPE_REGISTRY_COLLECTION)
            .await?
            .into_iter()
            .map(|document| bson::from_document(document).map_err(SchemaError::from))
            .collect()
    }

    pub async fn all_type_ids(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .all_records()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect())
    }

    pub async fn get(&self, type_id: &str) -> Result<Option<TypeRecord>> {
        match self
            .store
            .find_by(TYPE_REGISTRY_COLLECTION, "id", type_id)
            .await?
        {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite the record for `record.id`
    pub async fn upsert(&self, record: &TypeRecord) -> Result<()> {
        let document = bson::to_document(record)?;
        self.store
            .upsert_by(TYPE_REGISTRY_COLLECTION, "id", &record.id, document)
            .await?;
        debug!("Registered content type '{}'", record.id);
        Ok(())
    }

    /// Drop the registry collection entirely
    pub async fn drop(&self) -> Result<()> {
        self.store.drop_collection(TYPE_REGISTRY_COLLECTION).await
    }
}
