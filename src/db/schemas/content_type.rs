//! Type registry document schema
//!
//! One document per content type that has been applied successfully.

use serde::{Deserialize, Serialize};

use crate::db::schemas::Metadata;
use crate::db::store::{IndexDefinition, IntoIndexes};
use crate::model::{normalize_specs, IndexSpec, TypeDefinition};

/// Collection name for the type registry
pub const TYPE_REGISTRY_COLLECTION: &str = "content_types";

/// Registry document for one content type
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TypeRecord {
    /// Type id, unique across the registry
    pub id: String,

    pub display_name: String,

    pub description: String,

    /// Unique index specs exactly as last applied
    #[serde(default)]
    pub unique_indexes: Vec<IndexSpec>,

    /// Search index specs exactly as last applied
    #[serde(default)]
    pub search_indexes: Vec<IndexSpec>,

    #[serde(default)]
    pub child_types: Vec<String>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl TypeRecord {
    /// Record for a definition, carrying over the creation time of the record it replaces
    pub fn from_definition(definition: &TypeDefinition, previous: Option<&TypeRecord>) -> Self {
        let metadata = match previous {
            Some(previous) => Metadata::touched(&previous.metadata),
            None => Metadata::new(),
        };

        Self {
            id: definition.id.clone(),
            display_name: definition.display_name.clone(),
            description: definition.description.clone(),
            unique_indexes: definition.unique_indexes.clone(),
            search_indexes: definition.search_indexes.clone(),
            child_types: definition.child_types.clone(),
            metadata,
        }
    }

    pub fn to_definition(&self) -> TypeDefinition {
        TypeDefinition {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            unique_indexes: self.unique_indexes.clone(),
            search_indexes: self.search_indexes.clone(),
            child_types: self.child_types.clone(),
        }
    }

    pub fn normalized_unique_indexes(&self) -> Vec<Vec<String>> {
        normalize_specs(Some(&self.unique_indexes))
    }

    pub fn normalized_search_indexes(&self) -> Vec<Vec<String>> {
        normalize_specs(Some(&self.search_indexes))
    }

    /// Whether applying `definition` would leave this record as it is, timestamps aside
    pub fn matches(&self, definition: &TypeDefinition) -> bool {
        self.display_name == definition.display_name
            && self.description == definition.description
            && self.child_types == definition.child_types
            && self.normalized_unique_indexes() == definition.normalized_unique_indexes()
            && self.normalized_search_indexes() == definition.normalized_search_indexes()
    }
}

impl IntoIndexes for TypeRecord {
    fn into_indices() -> Vec<IndexDefinition> {
        // One registry document per type id
        vec![IndexDefinition::new(vec!["id".to_string()], true)]
    }
}
