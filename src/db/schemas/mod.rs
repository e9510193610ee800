//! Database schemas for the schema manager
//!
//! Defines the document structure of the type registry.

mod content_type;
mod metadata;

pub use content_type::{TypeRecord, TYPE_REGISTRY_COLLECTION};
pub use metadata::Metadata;
