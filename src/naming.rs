//! Collection and index naming
//!
//! Type ids map onto unit collection names by a fixed prefix, and index
//! field lists map onto the names MongoDB assigns by default, so that an
//! index listing can be diffed against a definition directly.

use crate::types::{Result, SchemaError};

/// Prefix shared by every per-type unit collection
pub const TYPE_COLLECTION_PREFIX: &str = "units_";

/// Name MongoDB gives the implicit `_id` index
pub const IDENTITY_INDEX_NAME: &str = "_id_";

/// Sort direction used for every declared index
pub const ASCENDING: i32 = 1;

/// Nested-field delimiter in MongoDB field paths
pub const PATH_SEPARATOR: char = '.';

/// Name of the collection holding units of the given type
pub fn unit_collection_name(type_id: &str) -> String {
    format!("{}{}", TYPE_COLLECTION_PREFIX, type_id)
}

/// Whether a store collection is a unit collection
pub fn is_type_collection(collection_name: &str) -> bool {
    collection_name.starts_with(TYPE_COLLECTION_PREFIX)
}

/// Default index name for an ascending index over `fields`
///
/// `["compound_1", "compound_2"]` becomes `compound_1_1_compound_2_1`.
pub fn index_entry_name<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| format!("{}_{}", field.as_ref(), ASCENDING))
        .collect::<Vec<_>>()
        .join("_")
}

/// Check a type id can be embedded in a collection name
pub fn validate_type_id(type_id: &str) -> Result<()> {
    let reason = if type_id.is_empty() {
        Some("must not be empty".to_string())
    } else {
        type_id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            .map(|c| format!("character '{}' is not allowed", c))
    };

    match reason {
        Some(reason) => Err(SchemaError::InvalidTypeId {
            type_id: type_id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Check a field name is usable as an index key.
///
/// Returns the reason the name is refused, if any.
pub fn field_name_problem(field: &str) -> Option<String> {
    if field.is_empty() {
        Some("field name must not be empty".to_string())
    } else if field.contains(PATH_SEPARATOR) {
        Some(format!(
            "field name '{}' contains the path separator '{}'",
            field, PATH_SEPARATOR
        ))
    } else if field.starts_with('$') {
        Some(format!("field name '{}' must not start with '$'", field))
    } else if field.contains('\0') {
        Some("field name must not contain NUL".to_string())
    } else {
        None
    }
}
