//! Document store port
//!
//! The engine keeps everything it stores in named collections of opaque
//! `{id, value}` documents, grouped per database. Any backend offering these
//! primitives can host docrel.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub value: String,
}

impl Document {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Minimal per-collection CRUD used by the engine
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a collection; creating an existing collection is a no-op
    async fn create_collection(&self, db: &str, name: &str) -> Result<()>;

    /// Drop a collection and its documents; dropping a missing collection is a no-op
    async fn drop_collection(&self, db: &str, name: &str) -> Result<()>;

    /// Names of the collections of a database
    async fn list_collections(&self, db: &str) -> Result<Vec<String>>;

    /// Insert a new document. Fails if the id is already taken.
    async fn insert(&self, db: &str, collection: &str, document: Document) -> Result<()>;

    async fn find_by_id(&self, db: &str, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Every document of a collection, ordered by id
    async fn find_all(&self, db: &str, collection: &str) -> Result<Vec<Document>>;

    /// Replace the value stored under `id`, inserting the document if absent
    async fn update_value(&self, db: &str, collection: &str, id: &str, value: &str) -> Result<()>;

    /// Delete a document, returning how many were removed
    async fn delete_by_id(&self, db: &str, collection: &str, id: &str) -> Result<u64>;
}
