//! Shared types for the schema manager

pub mod error;

pub use error::{DefinitionFailure, IndexCreationError, Result, SchemaError};
