//! Content types database
//!
//! Converges the document store to a batch of [`TypeDefinition`]s: one unit
//! collection per type, carrying exactly the declared unique and search
//! indexes, and one registry record per type.
//!
//! Definitions are applied independently of each other. A definition that
//! fails (bad id, bad index field, store rejection) is recorded and the batch
//! carries on; the failures are reported together at the end and nothing that
//! succeeded is rolled back. Callers must not run two batches concurrently.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::db::{DocumentStore, IndexDefinition, TypeRecord};
use crate::model::TypeDefinition;
use crate::naming::{is_type_collection, unit_collection_name, validate_type_id};
use crate::registry::TypeRegistry;
use crate::sync::{check_index, IndexSynchronizer};
use crate::types::{DefinitionFailure, Result, SchemaError};

/// What happened to a single definition during an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionOutcome {
    /// First successful apply of this type id
    Created,
    /// Previously registered; indexes or metadata changed
    Updated,
    /// Previously registered and already in the desired state
    Unchanged,
}

/// Result of a successful [`TypesDatabase::update`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,

    /// Registered type ids absent from the batch (advisory unless requested as an error)
    pub missing: BTreeSet<String>,
}

impl UpdateSummary {
    fn record(&mut self, type_id: &str, outcome: DefinitionOutcome) {
        let bucket = match outcome {
            DefinitionOutcome::Created => &mut self.created,
            DefinitionOutcome::Updated => &mut self.updated,
            DefinitionOutcome::Unchanged => &mut self.unchanged,
        };
        bucket.push(type_id.to_string());
    }
}

/// Schema manager for content type collections
pub struct TypesDatabase {
    store: Arc<dyn DocumentStore>,
    registry: TypeRegistry,
}

impl TypesDatabase {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            registry: TypeRegistry::new(store.clone()),
            store,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Apply a batch of type definitions.
    ///
    /// Fails with [`SchemaError::UpdateFailed`] if any definition could not
    /// be applied, and otherwise, when `error_on_missing_definitions` is
    /// set, with [`SchemaError::MissingDefinitions`] if types registered
    /// before the call are absent from `definitions`. Store connectivity
    /// errors abort the batch immediately.
    pub async fn update(
        &self,
        definitions: &[TypeDefinition],
        error_on_missing_definitions: bool,
    ) -> Result<UpdateSummary> {
        self.registry.ensure().await?;
        let registered_ids = self.registry.all_type_ids().await?;

        info!(
            "Updating {} content type definition(s) ({} currently registered)",
            definitions.len(),
            registered_ids.len()
        );

        let mut summary = UpdateSummary::default();
        let mut failures: Vec<DefinitionFailure> = Vec::new();

        for definition in definitions {
            match self.create_or_update_type(definition).await {
                Ok(outcome) => {
                    debug!("Content type '{}': {:?}", definition.id, outcome);
                    summary.record(&definition.id, outcome);
                }
                Err(e) if e.is_definition_failure() => {
                    error!("Failed to apply content type '{}': {}", definition.id, e);
                    failures.push(DefinitionFailure {
                        definition: definition.clone(),
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if !failures.is_empty() {
            return Err(SchemaError::UpdateFailed(failures));
        }

        let incoming_ids: BTreeSet<&str> = definitions.iter().map(|d| d.id.as_str()).collect();
        summary.missing = registered_ids
            .into_iter()
            .filter(|id| !incoming_ids.contains(id.as_str()))
            .collect();

        if !summary.missing.is_empty() {
            if error_on_missing_definitions {
                return Err(SchemaError::MissingDefinitions(summary.missing));
            }
            warn!(
                "{} registered content type(s) have no definition in this batch: {:?}",
                summary.missing.len(),
                summary.missing
            );
        }

        info!(
            "Content types updated: {} created, {} updated, {} unchanged",
            summary.created.len(),
            summary.updated.len(),
            summary.unchanged.len()
        );

        Ok(summary)
    }

    /// Apply one definition: collection, index delta, registry record
    pub async fn create_or_update_type(
        &self,
        definition: &TypeDefinition,
    ) -> Result<DefinitionOutcome> {
        validate_type_id(&definition.id)?;

        let collection = unit_collection_name(&definition.id);
        self.store.ensure_collection(&collection).await?;

        let previous = self.registry.get(&definition.id).await?;
        let changed_indexes = self.update_indexes(definition, previous.as_ref()).await?;

        let outcome = match &previous {
            None => DefinitionOutcome::Created,
            Some(record) if changed_indexes || !record.matches(definition) => {
                DefinitionOutcome::Updated
            }
            Some(_) => DefinitionOutcome::Unchanged,
        };

        if outcome != DefinitionOutcome::Unchanged {
            let record = TypeRecord::from_definition(definition, previous.as_ref());
            self.registry.upsert(&record).await?;
        }

        Ok(outcome)
    }

    /// Replace each index kind whose specs differ from the registered ones,
    /// then make sure the full desired sets exist.
    ///
    /// Returns whether any index was dropped or created.
    async fn update_indexes(
        &self,
        definition: &TypeDefinition,
        previous: Option<&TypeRecord>,
    ) -> Result<bool> {
        let collection = unit_collection_name(&definition.id);
        let sync = IndexSynchronizer::new(self.store.as_ref());

        let unique_fields = definition.normalized_unique_indexes();
        let search_fields = definition.normalized_search_indexes();

        let unique: Vec<IndexDefinition> = unique_fields
            .iter()
            .map(|fields| IndexDefinition::new(fields.clone(), true))
            .collect();
        let search: Vec<IndexDefinition> = search_fields
            .iter()
            .map(|fields| IndexDefinition::new(fields.clone(), false))
            .collect();

        // Refuse bad field names before dropping anything
        let invalid: Vec<_> = unique
            .iter()
            .chain(&search)
            .filter_map(|index| check_index(&definition.id, index))
            .collect();
        if !invalid.is_empty() {
            return Err(SchemaError::IndexCreation(invalid));
        }

        let mut writes = 0;
        if let Some(previous) = previous {
            let old_unique = previous.normalized_unique_indexes();
            if old_unique != unique_fields {
                writes += sync.drop_indexes(&collection, &old_unique).await?;
            }
            let old_search = previous.normalized_search_indexes();
            if old_search != search_fields {
                writes += sync.drop_indexes(&collection, &old_search).await?;
            }
        }

        // Attempt both kinds before reporting so every failure is listed
        let unique_result = sync.apply_indexes(&collection, &definition.id, &unique).await;
        let search_result = sync.apply_indexes(&collection, &definition.id, &search).await;

        match (unique_result, search_result) {
            (Ok(a), Ok(b)) => Ok(writes + a + b > 0),
            (Err(SchemaError::IndexCreation(mut a)), Err(SchemaError::IndexCreation(b))) => {
                a.extend(b);
                Err(SchemaError::IndexCreation(a))
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    /// Every unit collection in the store, registered or not
    pub async fn all_type_collection_names(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_collection_names()
            .await?
            .into_iter()
            .filter(|name| is_type_collection(name))
            .collect())
    }

    pub async fn all_type_ids(&self) -> Result<BTreeSet<String>> {
        self.registry.all_type_ids().await
    }

    pub async fn all_type_definitions(&self) -> Result<Vec<TypeDefinition>> {
        Ok(self
            .registry
            .all_records()
            .await?
            .iter()
            .map(TypeRecord::to_definition)
            .collect())
    }

    pub async fn type_definition(&self, type_id: &str) -> Result<Option<TypeDefinition>> {
        Ok(self
            .registry
            .get(type_id)
            .await?
            .map(|record| record.to_definition()))
    }

    /// Registered unique indexes of a type as field lists, `None` if unknown
    pub async fn type_units_unique_indexes(&self, type_id: &str) -> Result<Option<Vec<Vec<String>>>> {
        Ok(self
            .registry
            .get(type_id)
            .await?
            .map(|record| record.normalized_unique_indexes()))
    }

    /// Registered search indexes of a type as field lists, `None` if unknown
    pub async fn type_units_search_indexes(&self, type_id: &str) -> Result<Option<Vec<Vec<String>>>> {
        Ok(self
            .registry
            .get(type_id)
            .await?
            .map(|record| record.normalized_search_indexes()))
    }

    /// Indexes actually present on a type's unit collection, `_id_` included
    pub async fn collection_indexes(&self, type_id: &str) -> Result<Vec<IndexDefinition>> {
        self.store.list_indexes(&unit_collection_name(type_id)).await
    }

    /// Drop every unit collection and the registry.
    ///
    /// Administrative reset for test and bootstrap environments.
    pub async fn clean(&self) -> Result<()> {
        let collections = self.all_type_collection_names().await?;
        for name in &collections {
            self.store.drop_collection(name).await?;
        }
        self.registry.drop().await?;

        warn!(
            "Dropped {} content type collection(s) and the type registry",
            collections.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::model::IndexSpec;

    fn database() -> (Arc<MemoryStore>, TypesDatabase) {
        let store = Arc::new(MemoryStore::new());
        let database = TypesDatabase::new(store.clone());
        (store, database)
    }

    fn rpm() -> TypeDefinition {
        TypeDefinition::new("rpm", "RPM", "RPM Packages")
            .with_unique_indexes(Some(["name"]))
            .with_search_indexes(Some(["arch"]))
    }

    #[tokio::test]
    async fn test_create_type_collection() {
        let (store, db) = database();

        let outcome = db.create_or_update_type(&rpm()).await.unwrap();
        assert_eq!(outcome, DefinitionOutcome::Created);

        let records = db.registry().all_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "rpm");
        assert_eq!(records[0].display_name, "RPM");
        assert_eq!(records[0].description, "RPM Packages");
        assert_eq!(records[0].unique_indexes, vec![IndexSpec::from("name")]);
        assert_eq!(records[0].search_indexes, vec![IndexSpec::from("arch")]);

        let names = store.list_collection_names().await.unwrap();
        assert!(names.contains(&unit_collection_name("rpm")));
    }

    #[tokio::test]
    async fn test_update_existing_type_collection() {
        let (_store, db) = database();
        db.create_or_update_type(&rpm()).await.unwrap();

        let changed = TypeDefinition::new("rpm", "new-name", "new-description")
            .with_unique_indexes(None::<Vec<&str>>)
            .with_search_indexes(None::<Vec<&str>>);
        let outcome = db.create_or_update_type(&changed).await.unwrap();
        assert_eq!(outcome, DefinitionOutcome::Updated);

        let records = db.registry().all_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "new-name");
        assert_eq!(records[0].description, "new-description");
        assert!(records[0].unique_indexes.is_empty());
        assert!(records[0].search_indexes.is_empty());

        // Only the identity index is left
        assert_eq!(db.collection_indexes("rpm").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reapply_is_unchanged() {
        let (store, db) = database();
        db.create_or_update_type(&rpm()).await.unwrap();
        let writes = store.index_writes();

        let outcome = db.create_or_update_type(&rpm()).await.unwrap();
        assert_eq!(outcome, DefinitionOutcome::Unchanged);
        assert_eq!(store.index_writes(), writes);
    }

    #[tokio::test]
    async fn test_failed_type_keeps_last_good_record() {
        let (_store, db) = database();
        db.create_or_update_type(&rpm()).await.unwrap();

        let busted = rpm().with_unique_indexes(Some(["bad..dot..notation"]));
        let result = db.create_or_update_type(&busted).await;
        assert!(matches!(result, Err(SchemaError::IndexCreation(_))));

        let record = db.registry().get("rpm").await.unwrap().unwrap();
        assert_eq!(record.unique_indexes, vec![IndexSpec::from("name")]);

        // The previous indexes are still on the collection
        let names: Vec<String> = db
            .collection_indexes("rpm")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"name_1".to_string()));
        assert!(names.contains(&"arch_1".to_string()));
    }

    #[tokio::test]
    async fn test_unique_and_search_failures_reported_together() {
        let (_store, db) = database();
        let busted = TypeDefinition::new("busted", "Busted", "Busted")
            .with_unique_indexes(Some(["bad.unique"]))
            .with_search_indexes(Some(["bad.search"]));

        match db.create_or_update_type(&busted).await {
            Err(SchemaError::IndexCreation(failures)) => assert_eq!(failures.len(), 2),
            other => panic!("expected IndexCreation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_surface_for_unknown_type() {
        let (_store, db) = database();
        assert!(db.type_definition("rpm").await.unwrap().is_none());
        assert!(db.type_units_unique_indexes("rpm").await.unwrap().is_none());
        assert!(db.collection_indexes("rpm").await.unwrap().is_empty());
    }
}
