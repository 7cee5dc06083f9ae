//! Index maintenance
//!
//! Every index, declared or foreign-key shadow, is a collection whose entries
//! map an indexed key (`$`-joined column values) to the `#`-joined primary
//! keys of the rows carrying it. Both families are maintained on every insert
//! and delete.

use indexmap::IndexMap;
use tracing::debug;

use crate::catalog::{IndexDef, TableDef};
use crate::error::{Error, Result};
use crate::storage::codec::KEY_DELIMITER;
use crate::storage::{DocumentStore, Row, RowCodec, Value};

/// Index entry operations against one database of a document store
pub struct IndexStore<'a> {
    store: &'a dyn DocumentStore,
    db: &'a str,
}

impl<'a> IndexStore<'a> {
    pub fn new(store: &'a dyn DocumentStore, db: &'a str) -> Self {
        Self { store, db }
    }

    /// Primary keys listed under `key`
    pub async fn lookup(&self, index: &IndexDef, key: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .find_by_id(self.db, &index.collection, key)
            .await?
            .map(|doc| RowCodec::split_key_list(&doc.value))
            .unwrap_or_default())
    }

    /// Every entry of the index as `(key, primary keys)`, ordered by key
    pub async fn entries(&self, index: &IndexDef) -> Result<Vec<(String, Vec<String>)>> {
        let documents = self.store.find_all(self.db, &index.collection).await?;
        Ok(documents
            .into_iter()
            .map(|doc| {
                let keys = RowCodec::split_key_list(&doc.value);
                (doc.id, keys)
            })
            .collect())
    }

    /// Append `pk` to the entry for `key`, creating the entry if needed
    pub async fn add_entry(&self, index: &IndexDef, key: &str, pk: &str) -> Result<()> {
        let mut keys = self.lookup(index, key).await?;
        if keys.iter().any(|k| k == pk) {
            return Ok(());
        }
        keys.push(pk.to_string());
        self.store
            .update_value(self.db, &index.collection, key, &RowCodec::join_key_list(&keys))
            .await
    }

    /// Remove `pk` from the entry for `key`, deleting the entry once it is empty
    pub async fn remove_entry(&self, index: &IndexDef, key: &str, pk: &str) -> Result<()> {
        let keys = self.lookup(index, key).await?;
        if keys.is_empty() {
            return Ok(());
        }

        let remaining: Vec<String> = keys.into_iter().filter(|k| k != pk).collect();
        if remaining.is_empty() {
            self.store.delete_by_id(self.db, &index.collection, key).await?;
        } else {
            self.store
                .update_value(
                    self.db,
                    &index.collection,
                    key,
                    &RowCodec::join_key_list(&remaining),
                )
                .await?;
        }
        Ok(())
    }

    /// Fail if a unique index of `table` already holds the key `row` would add
    pub async fn check_unique(&self, table: &TableDef, row: &Row) -> Result<()> {
        for index in table.indexes.iter().filter(|i| i.unique) {
            let Some(key) = RowCodec::index_key(&index.columns, row) else {
                continue;
            };
            if !self.lookup(index, &key).await?.is_empty() {
                return Err(Error::UniqueViolation {
                    index: index.name.clone(),
                    value: key,
                });
            }
        }
        Ok(())
    }

    /// Add the entries of a newly written row to every index of its table
    pub async fn insert_row(&self, table: &TableDef, pk: &str, row: &Row) -> Result<()> {
        for index in &table.indexes {
            if let Some(key) = RowCodec::index_key(&index.columns, row) {
                self.add_entry(index, &key, pk).await?;
                debug!(index = %index.name, key = %key, pk, "index entry added");
            }
        }
        Ok(())
    }

    /// Remove the entries of a deleted row from every index of its table
    pub async fn delete_row(&self, table: &TableDef, pk: &str, row: &Row) -> Result<()> {
        for index in &table.indexes {
            if let Some(key) = RowCodec::index_key(&index.columns, row) {
                self.remove_entry(index, &key, pk).await?;
                debug!(index = %index.name, key = %key, pk, "index entry removed");
            }
        }
        Ok(())
    }

    /// Fill a new index from existing rows.
    ///
    /// Nothing is written if a unique index would receive two rows under one key.
    pub async fn backfill(&self, index: &IndexDef, rows: &[(String, Row)]) -> Result<usize> {
        let mut entries: IndexMap<String, Vec<String>> = IndexMap::new();
        for (pk, row) in rows {
            if let Some(key) = RowCodec::index_key(&index.columns, row) {
                entries.entry(key).or_default().push(pk.clone());
            }
        }

        if index.unique {
            if let Some((key, _)) = entries.iter().find(|(_, pks)| pks.len() > 1) {
                return Err(Error::UniqueViolation {
                    index: index.name.clone(),
                    value: key.clone(),
                });
            }
        }

        for (key, pks) in &entries {
            self.store
                .update_value(self.db, &index.collection, key, &RowCodec::join_key_list(pks))
                .await?;
        }
        Ok(entries.len())
    }
}

/// Decode an index key back into one typed value per indexed column
pub fn decode_index_key(table: &TableDef, index: &IndexDef, key: &str) -> Vec<Value> {
    key.split(KEY_DELIMITER)
        .zip(&index.columns)
        .map(|(part, column)| match table.get_column(column) {
            Some(col) => Value::decode(part, &col.data_type),
            None => Value::Text(part.to_string()),
        })
        .collect()
}
