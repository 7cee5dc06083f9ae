//! System Catalog for docrel
//!
//! This module manages metadata about databases, tables and indexes. The
//! in-memory copy is authoritative for readers; [`Catalog::persist`] writes it
//! through the injected [`CatalogStore`].

use super::schema::{DatabaseDef, IndexDef, TableDef};
use super::store::{CatalogSnapshot, CatalogStore, MemoryCatalogStore};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type Databases = IndexMap<String, IndexMap<String, Arc<TableDef>>>;

/// System Catalog - manages all structural metadata
pub struct Catalog {
    /// Tables by name, per database, in creation order
    databases: RwLock<Databases>,
    /// Persistence port
    store: Arc<dyn CatalogStore>,
    /// Held from snapshot to save so saves land in order
    persist_lock: Mutex<()>,
}

impl Catalog {
    /// Create a new empty catalog persisting through `store`
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            databases: RwLock::new(IndexMap::new()),
            store,
            persist_lock: Mutex::new(()),
        }
    }

    /// Rebuild the catalog from the snapshot held by `store`
    pub fn open(store: Arc<dyn CatalogStore>) -> Result<Self> {
        let snapshot = store.load()?;
        let mut databases = IndexMap::new();
        for db in snapshot.databases {
            let tables = db
                .tables
                .into_iter()
                .map(|t| (t.name.clone(), Arc::new(t)))
                .collect();
            databases.insert(db.name, tables);
        }
        debug!(databases = databases.len(), "catalog loaded");

        Ok(Self {
            databases: RwLock::new(databases),
            store,
            persist_lock: Mutex::new(()),
        })
    }

    /// Empty catalog backed by a [`MemoryCatalogStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCatalogStore::new()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Databases>> {
        self.databases
            .read()
            .map_err(|_| Error::Internal("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Databases>> {
        self.databases
            .write()
            .map_err(|_| Error::Internal("catalog lock poisoned".to_string()))
    }

    /// Check if a database exists
    pub fn has_database(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    /// Get the tables of a database, in creation order
    pub fn find_database(&self, name: &str) -> Result<Vec<Arc<TableDef>>> {
        let databases = self.read()?;
        databases
            .get(name)
            .map(|tables| tables.values().cloned().collect())
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))
    }

    /// List all database names
    pub fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Get a table by name
    pub fn find_table(&self, db: &str, name: &str) -> Result<Arc<TableDef>> {
        let databases = self.read()?;
        let tables = databases
            .get(db)
            .ok_or_else(|| Error::DatabaseNotFound(db.to_string()))?;
        tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Create an empty database
    pub fn add_database(&self, name: &str) -> Result<()> {
        let mut databases = self.write()?;
        if databases.contains_key(name) {
            return Err(Error::DatabaseAlreadyExists(name.to_string()));
        }
        databases.insert(name.to_string(), IndexMap::new());
        Ok(())
    }

    /// Register a new table
    pub fn add_table(&self, db: &str, table: TableDef) -> Result<Arc<TableDef>> {
        let mut databases = self.write()?;
        let tables = databases
            .get_mut(db)
            .ok_or_else(|| Error::DatabaseNotFound(db.to_string()))?;
        if tables.contains_key(&table.name) {
            return Err(Error::TableAlreadyExists(table.name));
        }
        let table = Arc::new(table);
        tables.insert(table.name.clone(), table.clone());
        Ok(table)
    }

    /// Append an index descriptor to a table
    pub fn add_index(&self, db: &str, table: &str, index: IndexDef) -> Result<Arc<TableDef>> {
        let mut databases = self.write()?;
        let tables = databases
            .get_mut(db)
            .ok_or_else(|| Error::DatabaseNotFound(db.to_string()))?;
        let current = tables
            .get(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        if current.get_index(&index.name).is_some() {
            return Err(Error::IndexAlreadyExists(index.name, table.to_string()));
        }

        let mut updated = (**current).clone();
        updated.indexes.push(index);
        let updated = Arc::new(updated);
        tables.insert(table.to_string(), updated.clone());
        Ok(updated)
    }

    /// Remove a database, returning the tables it held
    pub fn remove_database(&self, name: &str) -> Result<Vec<Arc<TableDef>>> {
        let mut databases = self.write()?;
        databases
            .shift_remove(name)
            .map(|tables| tables.into_values().collect())
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))
    }

    /// Remove a table
    pub fn remove_table(&self, db: &str, name: &str) -> Result<Arc<TableDef>> {
        let mut databases = self.write()?;
        let tables = databases
            .get_mut(db)
            .ok_or_else(|| Error::DatabaseNotFound(db.to_string()))?;
        tables
            .shift_remove(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Tables (including `table` itself) declaring a foreign key that references `table`
    pub fn referencing_tables(&self, db: &str, table: &str) -> Result<Vec<Arc<TableDef>>> {
        Ok(self
            .find_database(db)?
            .into_iter()
            .filter(|t| t.references_to(table).next().is_some())
            .collect())
    }

    /// Copy of the whole catalog in serializable form
    pub fn snapshot(&self) -> Result<CatalogSnapshot> {
        let databases = self.read()?;
        Ok(CatalogSnapshot {
            databases: databases
                .iter()
                .map(|(name, tables)| DatabaseDef {
                    name: name.clone(),
                    tables: tables.values().map(|t| (**t).clone()).collect(),
                })
                .collect(),
        })
    }

    /// Write the current catalog through the persistence port
    pub fn persist(&self) -> Result<()> {
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|_| Error::Internal("catalog persist lock poisoned".to_string()))?;
        let snapshot = self.snapshot()?;
        self.store.save(&snapshot)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::{Column, ForeignKey, PrimaryKey};
    use crate::catalog::types::DataType;

    fn table(name: &str) -> TableDef {
        TableDef::new(
            name,
            format!("School_{}", name),
            vec![Column::new("id", DataType::Int)],
            PrimaryKey::declared(vec!["id".to_string()]),
        )
    }

    #[test]
    fn test_add_and_find_table() {
        let catalog = Catalog::in_memory();
        catalog.add_database("School").unwrap();
        catalog.add_table("School", table("Students")).unwrap();

        let found = catalog.find_table("School", "Students").unwrap();
        assert_eq!(found.name(), "Students");
        assert!(matches!(
            catalog.find_table("School", "students"),
            Err(Error::TableNotFound(_))
        ));
        assert!(matches!(
            catalog.find_table("Nope", "Students"),
            Err(Error::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        let catalog = Catalog::in_memory();
        catalog.add_database("School").unwrap();
        assert!(matches!(
            catalog.add_database("School"),
            Err(Error::DatabaseAlreadyExists(_))
        ));
        catalog.add_table("School", table("Students")).unwrap();
        assert!(matches!(
            catalog.add_table("School", table("Students")),
            Err(Error::TableAlreadyExists(_))
        ));
    }

    #[test]
    fn test_listing_keeps_creation_order() {
        let catalog = Catalog::in_memory();
        for name in ["b", "a", "c"] {
            catalog.add_database(name).unwrap();
        }
        catalog.remove_database("a").unwrap();
        assert_eq!(catalog.list_databases().unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_add_index_rejects_same_name() {
        let catalog = Catalog::in_memory();
        catalog.add_database("School").unwrap();
        catalog.add_table("School", table("Students")).unwrap();

        let index = IndexDef::new("by_id", vec!["id".to_string()], "School_Students_idx_by_id");
        let updated = catalog.add_index("School", "Students", index.clone()).unwrap();
        assert_eq!(updated.indexes.len(), 1);
        assert!(matches!(
            catalog.add_index("School", "Students", index),
            Err(Error::IndexAlreadyExists(..))
        ));
    }

    #[test]
    fn test_referencing_tables() {
        let catalog = Catalog::in_memory();
        catalog.add_database("School").unwrap();
        catalog.add_table("School", table("Students")).unwrap();
        let mut grades = table("Grades");
        grades.foreign_keys.push(ForeignKey {
            columns: vec!["id".to_string()],
            ref_table: "Students".to_string(),
            ref_columns: vec!["id".to_string()],
            shadow_index: "fk_Students_id".to_string(),
        });
        catalog.add_table("School", grades).unwrap();

        let referencing = catalog.referencing_tables("School", "Students").unwrap();
        assert_eq!(referencing.len(), 1);
        assert_eq!(referencing[0].name(), "Grades");
        assert!(catalog
            .referencing_tables("School", "Grades")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_persist_and_reopen() {
        let store = Arc::new(MemoryCatalogStore::new());
        let catalog = Catalog::new(store.clone());
        catalog.add_database("School").unwrap();
        catalog.add_table("School", table("Students")).unwrap();
        catalog.persist().unwrap();

        let reopened = Catalog::open(store).unwrap();
        assert_eq!(reopened.snapshot().unwrap(), catalog.snapshot().unwrap());
    }
}
