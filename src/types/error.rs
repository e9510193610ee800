//! Error types for the schema manager
//!
//! Per-definition errors (bad ids, bad index fields, store rejections) are
//! accumulated by the orchestrator. Connectivity errors are not.

use std::collections::BTreeSet;
use std::fmt;

use mongodb::error::ErrorKind;

use crate::model::TypeDefinition;

/// A single index that could not be created on a type's collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCreationError {
    /// Type owning the collection
    pub type_id: String,

    /// Field sequence of the offending index
    pub fields: Vec<String>,

    /// Why the index was refused
    pub reason: String,
}

impl fmt::Display for IndexCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index [{}] on type '{}': {}",
            self.fields.join(", "),
            self.type_id,
            self.reason
        )
    }
}

/// A definition that failed during a batch update, with its cause
#[derive(Debug, Clone)]
pub struct DefinitionFailure {
    pub definition: TypeDefinition,
    pub error: SchemaError,
}

/// Main error type for schema manager operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid type id '{type_id}': {reason}")]
    InvalidTypeId { type_id: String, reason: String },

    #[error("Index creation failed: {}", join_display(.0))]
    IndexCreation(Vec<IndexCreationError>),

    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("Failed to update {} type definition(s): {}", .0.len(), failed_ids(.0))]
    UpdateFailed(Vec<DefinitionFailure>),

    #[error("Missing type definitions: {}", join_ids(.0))]
    MissingDefinitions(BTreeSet<String>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchemaError {
    /// Whether this error belongs to one definition rather than to the store.
    ///
    /// The orchestrator records these and moves on to the next definition.
    pub fn is_definition_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidTypeId { .. }
                | Self::IndexCreation(_)
                | Self::Rejected(_)
                | Self::Serialization(_)
        )
    }

    /// Definitions carried by an `UpdateFailed`, in batch order
    pub fn type_definitions(&self) -> Vec<&TypeDefinition> {
        match self {
            Self::UpdateFailed(failures) => failures.iter().map(|f| &f.definition).collect(),
            _ => Vec::new(),
        }
    }

    /// Type ids carried by a `MissingDefinitions`
    pub fn missing_type_ids(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::MissingDefinitions(ids) => Some(ids),
            _ => None,
        }
    }
}

fn join_display(errors: &[IndexCreationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn failed_ids(failures: &[DefinitionFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.definition.id, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl From<mongodb::error::Error> for SchemaError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Command(_) | ErrorKind::Write(_) | ErrorKind::InvalidArgument { .. } => {
                Self::Rejected(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<bson::ser::Error> for SchemaError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for SchemaError {
    fn from(err: bson::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}

/// Result type alias for schema manager operations
pub type Result<T> = std::result::Result<T, SchemaError>;
