//! File-backed document store
//!
//! Keeps a [`MemoryStore`] and mirrors every collection to
//! `<root>/<db>/<collection>.json`, rewriting the file after each change.
//! Writers are serialised, and each file is replaced by renaming a freshly
//! written sibling over it.

use super::document::{Document, DocumentStore};
use super::memory::MemoryStore;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Document store persisted as one JSON file per collection
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    inner: MemoryStore,
    /// Held across each change and the flush that follows it
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store under `root`, loading every collection found there
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        let inner = MemoryStore::new();

        let mut databases = fs::read_dir(&root).await?;
        while let Some(db_entry) = databases.next_entry().await? {
            if !db_entry.file_type().await?.is_dir() {
                continue;
            }
            let db = db_entry.file_name().to_string_lossy().to_string();
            let mut files = fs::read_dir(db_entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(collection) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let json = fs::read_to_string(&path).await?;
                let documents: Vec<Document> = serde_json::from_str(&json)?;
                debug!(db = %db, collection, documents = documents.len(), "collection loaded");
                inner.load_collection(&db, collection, documents)?;
            }
        }

        Ok(Self {
            root,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, db: &str, collection: &str) -> PathBuf {
        self.root.join(db).join(format!("{}.json", collection))
    }

    async fn flush(&self, db: &str, collection: &str) -> Result<()> {
        let documents = self.inner.documents(db, collection)?;
        let path = self.collection_path(db, collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(&documents)?).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn create_collection(&self, db: &str, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.create_collection(db, name).await?;
        self.flush(db, name).await
    }

    async fn drop_collection(&self, db: &str, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.drop_collection(db, name).await?;
        match fs::remove_file(self.collection_path(db, name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_collections(&self, db: &str) -> Result<Vec<String>> {
        self.inner.list_collections(db).await
    }

    async fn insert(&self, db: &str, collection: &str, document: Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.insert(db, collection, document).await?;
        self.flush(db, collection).await
    }

    async fn find_by_id(&self, db: &str, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.find_by_id(db, collection, id).await
    }

    async fn find_all(&self, db: &str, collection: &str) -> Result<Vec<Document>> {
        self.inner.find_all(db, collection).await
    }

    async fn update_value(&self, db: &str, collection: &str, id: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.update_value(db, collection, id, value).await?;
        self.flush(db, collection).await
    }

    async fn delete_by_id(&self, db: &str, collection: &str, id: &str) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let removed = self.inner.delete_by_id(db, collection, id).await?;
        if removed > 0 {
            self.flush(db, collection).await?;
        }
        Ok(removed)
    }
}
