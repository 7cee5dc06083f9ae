//! In-memory document store
//!
//! Collections are ordered maps, so scans are deterministic.

use super::document::{Document, DocumentStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Collection = BTreeMap<String, String>;
type Collections = HashMap<String, BTreeMap<String, Collection>>;

/// Document store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Collections by name, per database
    databases: RwLock<Collections>,
    /// Collections whose writes are refused
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write to `collection` fail with a storage error
    pub fn fail_writes_to(&self, collection: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(collection.to_string());
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.databases
            .read()
            .map_err(|_| Error::Storage("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.databases
            .write()
            .map_err(|_| Error::Storage("store lock poisoned".to_string()))
    }

    fn check_writable(&self, collection: &str) -> Result<()> {
        let failing = self
            .failing
            .read()
            .map_err(|_| Error::Storage("store lock poisoned".to_string()))?;
        if failing.contains(collection) {
            return Err(Error::Storage(format!(
                "write to collection '{}' rejected",
                collection
            )));
        }
        Ok(())
    }

    /// Documents of a collection, ordered by id
    pub fn documents(&self, db: &str, collection: &str) -> Result<Vec<Document>> {
        let databases = self.read()?;
        Ok(databases
            .get(db)
            .and_then(|collections| collections.get(collection))
            .map(|docs| {
                docs.iter()
                    .map(|(id, value)| Document::new(id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Replace the contents of a collection, creating it if needed
    pub fn load_collection(&self, db: &str, collection: &str, documents: Vec<Document>) -> Result<()> {
        let mut databases = self.write()?;
        let docs = documents.into_iter().map(|d| (d.id, d.value)).collect();
        databases
            .entry(db.to_string())
            .or_default()
            .insert(collection.to_string(), docs);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_collection(&self, db: &str, name: &str) -> Result<()> {
        self.check_writable(name)?;
        let mut databases = self.write()?;
        databases
            .entry(db.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn drop_collection(&self, db: &str, name: &str) -> Result<()> {
        let mut databases = self.write()?;
        if let Some(collections) = databases.get_mut(db) {
            collections.remove(name);
            if collections.is_empty() {
                databases.remove(db);
            }
        }
        Ok(())
    }

    async fn list_collections(&self, db: &str) -> Result<Vec<String>> {
        let databases = self.read()?;
        Ok(databases
            .get(db)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, db: &str, collection: &str, document: Document) -> Result<()> {
        self.check_writable(collection)?;
        let mut databases = self.write()?;
        let docs = databases
            .entry(db.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        if docs.contains_key(&document.id) {
            return Err(Error::Storage(format!(
                "document '{}' already exists in '{}'",
                document.id, collection
            )));
        }
        docs.insert(document.id, document.value);
        Ok(())
    }

    async fn find_by_id(&self, db: &str, collection: &str, id: &str) -> Result<Option<Document>> {
        let databases = self.read()?;
        Ok(databases
            .get(db)
            .and_then(|collections| collections.get(collection))
            .and_then(|docs| docs.get(id))
            .map(|value| Document::new(id, value.clone())))
    }

    async fn find_all(&self, db: &str, collection: &str) -> Result<Vec<Document>> {
        self.documents(db, collection)
    }

    async fn update_value(&self, db: &str, collection: &str, id: &str, value: &str) -> Result<()> {
        self.check_writable(collection)?;
        let mut databases = self.write()?;
        databases
            .entry(db.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_by_id(&self, db: &str, collection: &str, id: &str) -> Result<u64> {
        self.check_writable(collection)?;
        let mut databases = self.write()?;
        let removed = databases
            .get_mut(db)
            .and_then(|collections| collections.get_mut(collection))
            .and_then(|docs| docs.remove(id));
        Ok(removed.map_or(0, |_| 1))
    }
}
