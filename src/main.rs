//! Content Types - administrative CLI for the content type schema manager

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_types::{
    config::{Args, Command},
    DocumentStore, MemoryStore, MongoStore, SchemaError, TypeDefinition, TypesDatabase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("content_types={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let store: Arc<dyn DocumentStore> = if args.memory {
        Arc::new(MemoryStore::new())
    } else {
        info!("MongoDB: {} (database '{}')", args.mongodb_uri, args.mongodb_db);
        Arc::new(MongoStore::new(&args.mongodb_uri, &args.mongodb_db).await?)
    };
    let types_db = TypesDatabase::new(store);

    match &args.command {
        Command::Update {
            definitions,
            error_on_missing,
        } => {
            let contents = std::fs::read_to_string(definitions)?;
            let definitions: Vec<TypeDefinition> =
                serde_json::from_str(&contents).map_err(SchemaError::from)?;

            match types_db.update(&definitions, *error_on_missing).await {
                Ok(summary) => {
                    info!(
                        "Applied {} definition(s): {} created, {} updated, {} unchanged",
                        definitions.len(),
                        summary.created.len(),
                        summary.updated.len(),
                        summary.unchanged.len()
                    );
                }
                Err(SchemaError::UpdateFailed(failures)) => {
                    for failure in &failures {
                        error!("  {}: {}", failure.definition.id, failure.error);
                    }
                    error!("{} content type definition(s) failed to load", failures.len());
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Content type update failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::List => {
            for name in types_db.all_type_collection_names().await? {
                println!("collection  {}", name);
            }
            for definition in types_db.all_type_definitions().await? {
                println!(
                    "type        {} ({}): {} unique, {} search",
                    definition.id,
                    definition.display_name,
                    definition.unique_indexes.len(),
                    definition.search_indexes.len()
                );
            }
        }
        Command::Clean { .. } => {
            types_db.clean().await?;
            info!("Content types database cleaned");
        }
    }

    Ok(())
}
