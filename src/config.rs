//! Configuration for the content-types tool
//!
//! CLI arguments and environment variable handling using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::{Result, SchemaError};

/// Content-type schema manager
///
/// Converges per-type unit collections and their indexes to a set of
/// content type definitions.
#[derive(Parser, Debug, Clone)]
#[command(name = "content-types")]
#[command(about = "Manage content type collections and indexes in MongoDB")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "content")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Run against an empty in-memory store instead of MongoDB
    #[arg(long, default_value = "false")]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Apply type definitions from a JSON file
    Update {
        /// JSON array of type definitions
        definitions: PathBuf,

        /// Fail when registered types are missing from the file
        #[arg(long, default_value = "false")]
        error_on_missing: bool,
    },

    /// List unit collections and registered types
    List,

    /// Drop every unit collection and the type registry
    Clean {
        /// Confirm the reset
        #[arg(long, default_value = "false")]
        yes: bool,
    },
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.memory {
            if !self.mongodb_uri.starts_with("mongodb://")
                && !self.mongodb_uri.starts_with("mongodb+srv://")
            {
                return Err(SchemaError::Config(format!(
                    "MONGODB_URI must start with mongodb:// or mongodb+srv://, got '{}'",
                    self.mongodb_uri
                )));
            }
            if self.mongodb_db.is_empty() {
                return Err(SchemaError::Config("MONGODB_DB must not be empty".into()));
            }
        }

        match &self.command {
            Command::Update { definitions, .. } if !definitions.exists() => {
                Err(SchemaError::Config(format!(
                    "Definitions file not found: {}",
                    definitions.display()
                )))
            }
            Command::Clean { yes: false } => Err(SchemaError::Config(
                "clean drops every content type collection; pass --yes to confirm".into(),
            )),
            _ => Ok(()),
        }
    }
}
