//! Index synchronizer
//!
//! Brings the index set of one collection in line with a desired set of
//! (field list, uniqueness) pairs. Indexes are matched by entry name and
//! keys, so re-applying an already converged set issues no writes. The `_id_`
//! index is never touched.

use tracing::{debug, info};

use crate::db::{DocumentStore, IndexDefinition};
use crate::naming::{field_name_problem, index_entry_name};
use crate::types::{IndexCreationError, Result, SchemaError};

pub struct IndexSynchronizer<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> IndexSynchronizer<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Indexes on `collection` other than `_id_`
    pub async fn existing_indexes(&self, collection: &str) -> Result<Vec<IndexDefinition>> {
        Ok(self
            .store
            .list_indexes(collection)
            .await?
            .into_iter()
            .filter(|index| !index.is_identity())
            .collect())
    }

    /// Create every desired index that is not already present.
    ///
    /// All indexes are attempted; if any could not be created the failures
    /// are returned together as [`SchemaError::IndexCreation`]. Returns the
    /// number of indexes created.
    pub async fn apply_indexes(
        &self,
        collection: &str,
        type_id: &str,
        desired: &[IndexDefinition],
    ) -> Result<usize> {
        let mut existing = self.existing_indexes(collection).await?;
        let mut failures = Vec::new();
        let mut created = 0;

        for index in desired {
            if let Some(failure) = check_index(type_id, index) {
                failures.push(failure);
                continue;
            }

            if let Some(position) = existing.iter().position(|e| e.name == index.name) {
                let current = &existing[position];
                if current.keys != index.keys {
                    failures.push(IndexCreationError {
                        type_id: type_id.to_string(),
                        fields: index.keys.clone(),
                        reason: format!(
                            "index name '{}' collides with an existing index over [{}]",
                            index.name,
                            current.keys.join(", ")
                        ),
                    });
                    continue;
                }
                if current.unique == index.unique {
                    continue;
                }
                if current.unique {
                    debug!(
                        "Search index '{}' on '{}' is covered by the unique index",
                        index.name, collection
                    );
                    continue;
                }
                // Present without the uniqueness constraint; rebuild it
                self.store.drop_index(collection, &index.name).await?;
                existing.remove(position);
            }

            match self.store.create_index(collection, index).await {
                Ok(()) => {
                    debug!(
                        "Created {} index '{}' on '{}'",
                        if index.unique { "unique" } else { "search" },
                        index.name,
                        collection
                    );
                    existing.push(index.clone());
                    created += 1;
                }
                Err(e) if e.is_definition_failure() => failures.push(IndexCreationError {
                    type_id: type_id.to_string(),
                    fields: index.keys.clone(),
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e),
            }
        }

        if failures.is_empty() {
            Ok(created)
        } else {
            Err(SchemaError::IndexCreation(failures))
        }
    }

    /// Drop the indexes named by `field_sequences`; absent ones are skipped.
    ///
    /// Returns the number of indexes dropped.
    pub async fn drop_indexes(
        &self,
        collection: &str,
        field_sequences: &[Vec<String>],
    ) -> Result<usize> {
        let existing = self.existing_indexes(collection).await?;
        let mut dropped = 0;

        for fields in field_sequences {
            let name = index_entry_name(fields);
            if existing.iter().any(|e| e.name == name && &e.keys == fields) {
                self.store.drop_index(collection, &name).await?;
                dropped += 1;
            }
        }

        if dropped > 0 {
            info!("Dropped {} index(es) from '{}'", dropped, collection);
        }
        Ok(dropped)
    }
}

/// Refusal for an index whose fields the store cannot key on, if any
pub fn check_index(type_id: &str, index: &IndexDefinition) -> Option<IndexCreationError> {
    let reason = if index.keys.is_empty() {
        Some("index declares no fields".to_string())
    } else {
        index.keys.iter().find_map(|field| field_name_problem(field))
    };

    reason.map(|reason| IndexCreationError {
        type_id: type_id.to_string(),
        fields: index.keys.clone(),
        reason,
    })
}
