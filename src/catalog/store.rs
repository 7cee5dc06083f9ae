//! Catalog persistence
//!
//! The catalog is written through a [`CatalogStore`] after every structural
//! change and read back once at startup.

use super::schema::DatabaseDef;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serializable image of the whole catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub databases: Vec<DatabaseDef>,
}

/// Where the catalog snapshot lives
pub trait CatalogStore: Send + Sync {
    /// Read the last saved snapshot. A store that was never written yields an empty catalog.
    fn load(&self) -> Result<CatalogSnapshot>;

    /// Replace the saved snapshot
    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()>;
}

/// Snapshot stored as pretty-printed JSON in a single file
#[derive(Debug, Clone)]
pub struct JsonCatalogFile {
    path: PathBuf,
}

impl JsonCatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonCatalogFile {
    fn load(&self) -> Result<CatalogSnapshot> {
        if !self.path.exists() {
            return Ok(CatalogSnapshot::default());
        }
        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// In-memory store, used by tests and embedded engines
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    snapshot: Mutex<Option<CatalogSnapshot>>,
    saves: Mutex<usize>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently saved snapshot
    pub fn saved(&self) -> Option<CatalogSnapshot> {
        self.snapshot.lock().ok().and_then(|s| s.clone())
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<CatalogSnapshot> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|_| Error::Internal("catalog store lock poisoned".to_string()))?;
        Ok(snapshot.clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let mut stored = self
            .snapshot
            .lock()
            .map_err(|_| Error::Internal("catalog store lock poisoned".to_string()))?;
        *stored = Some(snapshot.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_catalog() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogFile::new(dir.path().join("catalog.json"));
        assert_eq!(store.load().unwrap(), CatalogSnapshot::default());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogFile::new(dir.path().join("meta").join("catalog.json"));
        let snapshot = CatalogSnapshot {
            databases: vec![DatabaseDef {
                name: "School".to_string(),
                tables: Vec::new(),
            }],
        };
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn test_save_replaces_file_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let store = JsonCatalogFile::new(&path);

        let big = CatalogSnapshot {
            databases: (0..20)
                .map(|i| DatabaseDef {
                    name: format!("Database{}", i),
                    tables: Vec::new(),
                })
                .collect(),
        };
        let small = CatalogSnapshot {
            databases: vec![DatabaseDef {
                name: "A".to_string(),
                tables: Vec::new(),
            }],
        };
        store.save(&big).unwrap();
        store.save(&small).unwrap();

        assert_eq!(store.load().unwrap(), small);
        assert!(!dir.path().join("catalog.json.tmp").exists());
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryCatalogStore::new();
        assert!(store.saved().is_none());
        store.save(&CatalogSnapshot::default()).unwrap();
        store.save(&CatalogSnapshot::default()).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}
