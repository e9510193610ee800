//! MongoDB-backed document store
//!
//! Pattern adapted from holo-host/rust/util_libs/db/src/mongodb

use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{error::ErrorKind, options::IndexOptions, Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use crate::db::store::{DocumentStore, IndexDefinition};
use crate::types::{Result, SchemaError};

/// Server error code for a missing collection
const NAMESPACE_NOT_FOUND: i32 = 26;

/// Server error code for a missing index
const INDEX_NOT_FOUND: i32 = 27;

/// Server error code when creating a collection that already exists
const NAMESPACE_EXISTS: i32 = 48;

/// MongoDB client wrapper implementing [`DocumentStore`]
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect to MongoDB and verify the connection
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| SchemaError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SchemaError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    fn database(&self) -> Database {
        self.client.database(&self.db_name)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database().collection::<Document>(name)
    }
}

fn command_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn is_code(err: &mongodb::error::Error, codes: &[i32]) -> bool {
    command_code(err).is_some_and(|code| codes.contains(&code))
}

fn field_filter(field: &str, value: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(field, value);
    filter
}

fn to_index_definition(model: IndexModel) -> IndexDefinition {
    let keys: Vec<String> = model.keys.keys().cloned().collect();
    let (name, unique) = match model.options {
        Some(options) => (options.name, options.unique.unwrap_or(false)),
        None => (None, false),
    };

    match name {
        Some(name) => IndexDefinition { name, keys, unique },
        None => IndexDefinition::new(keys, unique),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.database().list_collection_names().await?)
    }

    async fn ensure_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            return Ok(());
        }

        match self.database().create_collection(name).await {
            Ok(()) => {
                debug!("Created collection '{}'", name);
                Ok(())
            }
            // Lost a race with another creator; the collection is there either way
            Err(e) if is_code(&e, &[NAMESPACE_EXISTS]) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        match self.collection(name).drop().await {
            Ok(()) => Ok(()),
            Err(e) if is_code(&e, &[NAMESPACE_NOT_FOUND]) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDefinition>> {
        let cursor = match self.collection(collection).list_indexes().await {
            Ok(cursor) => cursor,
            Err(e) if is_code(&e, &[NAMESPACE_NOT_FOUND]) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let models: Vec<IndexModel> = cursor.try_collect().await?;
        Ok(models.into_iter().map(to_index_definition).collect())
    }

    async fn create_index(&self, collection: &str, index: &IndexDefinition) -> Result<()> {
        let mut keys = Document::new();
        for field in &index.keys {
            keys.insert(field.clone(), crate::naming::ASCENDING);
        }

        let model = IndexModel::builder()
            .keys(keys)
            .options(Some(
                IndexOptions::builder()
                    .name(index.name.clone())
                    .unique(index.unique)
                    .build(),
            ))
            .build();

        self.collection(collection).create_index(model).await?;
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        match self.collection(collection).drop_index(name).await {
            Ok(()) => Ok(()),
            Err(e) if is_code(&e, &[INDEX_NOT_FOUND, NAMESPACE_NOT_FOUND]) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        let cursor = self.collection(collection).find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one(field_filter(field, value))
            .await?)
    }

    async fn upsert_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        document: Document,
    ) -> Result<()> {
        self.collection(collection)
            .replace_one(field_filter(field, value), document)
            .upsert(true)
            .await?;
        Ok(())
    }
}
