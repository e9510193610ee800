//! Content type definitions
//!
//! Non-database description of a content type as handed over by the
//! descriptor loader. Values here are never validated against the storage
//! naming scheme; that happens when the definition is applied.

use serde::{Deserialize, Deserializer, Serialize};

/// One index declared by a type: a single field or an ordered compound list
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum IndexSpec {
    Single(String),
    Compound(Vec<String>),
}

impl IndexSpec {
    /// Ordered field list for this index
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::Single(field) => vec![field.clone()],
            Self::Compound(fields) => fields.clone(),
        }
    }
}

impl From<&str> for IndexSpec {
    fn from(field: &str) -> Self {
        Self::Single(field.to_string())
    }
}

impl From<String> for IndexSpec {
    fn from(field: String) -> Self {
        Self::Single(field)
    }
}

impl<S: Into<String>> From<Vec<S>> for IndexSpec {
    fn from(fields: Vec<S>) -> Self {
        Self::Compound(fields.into_iter().map(Into::into).collect())
    }
}

/// Normalize a type's declared index specs into ordered field lists.
///
/// An absent list means the type declares no indexes of that kind.
pub fn normalize_specs(specs: Option<&[IndexSpec]>) -> Vec<Vec<String>> {
    specs
        .unwrap_or_default()
        .iter()
        .map(IndexSpec::fields)
        .collect()
}

/// Description of one content type and the indexes its units need
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TypeDefinition {
    /// Type identity, also the suffix of its unit collection name
    pub id: String,

    pub display_name: String,

    pub description: String,

    /// Indexes enforcing uniqueness across the type's units
    #[serde(default, deserialize_with = "null_as_empty")]
    pub unique_indexes: Vec<IndexSpec>,

    /// Non-unique indexes for lookups
    #[serde(default, deserialize_with = "null_as_empty")]
    pub search_indexes: Vec<IndexSpec>,

    /// Ids of types whose units this type may reference
    #[serde(default, deserialize_with = "null_as_empty")]
    pub child_types: Vec<String>,
}

impl TypeDefinition {
    /// Create a definition with no indexes and no child types
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            unique_indexes: Vec::new(),
            search_indexes: Vec::new(),
            child_types: Vec::new(),
        }
    }

    /// Replace the unique index specs; `None` clears them
    pub fn with_unique_indexes<I, S>(mut self, specs: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<IndexSpec>,
    {
        self.unique_indexes = collect_specs(specs);
        self
    }

    /// Replace the search index specs; `None` clears them
    pub fn with_search_indexes<I, S>(mut self, specs: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<IndexSpec>,
    {
        self.search_indexes = collect_specs(specs);
        self
    }

    pub fn with_child_types<I, S>(mut self, child_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_types = child_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn normalized_unique_indexes(&self) -> Vec<Vec<String>> {
        normalize_specs(Some(&self.unique_indexes))
    }

    pub fn normalized_search_indexes(&self) -> Vec<Vec<String>> {
        normalize_specs(Some(&self.search_indexes))
    }
}

/// Read an absent or `null` list as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn collect_specs<I, S>(specs: Option<I>) -> Vec<IndexSpec>
where
    I: IntoIterator<Item = S>,
    S: Into<IndexSpec>,
{
    specs
        .map(|specs| specs.into_iter().map(Into::into).collect())
        .unwrap_or_default()
}
