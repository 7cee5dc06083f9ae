//! Row codec
//!
//! A row is stored as a single document: its identifier is the primary-key
//! values joined by `$` in key order, and its value is every other column
//! joined by `#` in table-column order. Index entries reuse the same scheme:
//! the key is the `$`-joined indexed values and the value is the `#`-joined
//! list of primary keys sharing it.

use crate::catalog::TableDef;
use crate::error::{Error, Result};
use crate::storage::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Separates the parts of a composite key
pub const KEY_DELIMITER: char = '$';
/// Separates the non-key fields of a row, and the keys of an index entry
pub const VALUE_DELIMITER: char = '#';

/// Column name to value, in table-column order
pub type Row = IndexMap<String, Value>;

/// Encodes and decodes table rows
pub struct RowCodec;

impl RowCodec {
    /// Storage identifier of `row`: its primary-key values joined by `$`
    pub fn encode_key(table: &TableDef, row: &Row) -> Result<String> {
        if table.primary_key.synthetic {
            return Err(Error::Internal(format!(
                "table '{}' has a generated key",
                table.name
            )));
        }
        Self::join_fields(table, &table.primary_key.columns, row, KEY_DELIMITER)
    }

    /// Stored value of `row`: its non-key values joined by `#`
    pub fn encode_value(table: &TableDef, row: &Row) -> Result<String> {
        let columns: Vec<String> = table
            .value_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        Self::join_fields(table, &columns, row, VALUE_DELIMITER)
    }

    /// Encode a row of a table with a declared primary key
    pub fn encode(table: &TableDef, row: &Row) -> Result<(String, String)> {
        Ok((Self::encode_key(table, row)?, Self::encode_value(table, row)?))
    }

    fn join_fields(
        table: &TableDef,
        columns: &[String],
        row: &Row,
        delimiter: char,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(columns.len());
        for column in columns {
            match row.get(column) {
                Some(value) => parts.push(value.to_string()),
                None => {
                    return Err(Error::ArityMismatch {
                        table: table.name.clone(),
                        expected: columns.len(),
                        found: row.len(),
                    })
                }
            }
        }
        Ok(parts.join(&delimiter.to_string()))
    }

    /// Rebuild the row stored under `id` with value `value`
    pub fn decode(table: &TableDef, id: &str, value: &str) -> Result<Row> {
        let mut fields: HashMap<&str, &str> = HashMap::new();

        if !table.primary_key.synthetic {
            let parts: Vec<&str> = id.split(KEY_DELIMITER).collect();
            Self::check_arity(table, table.primary_key.columns.len(), parts.len())?;
            for (column, part) in table.primary_key.columns.iter().zip(parts) {
                fields.insert(column.as_str(), part);
            }
        }

        let value_columns = table.value_columns();
        let parts: Vec<&str> = if value_columns.is_empty() && value.is_empty() {
            Vec::new()
        } else {
            value.split(VALUE_DELIMITER).collect()
        };
        Self::check_arity(table, value_columns.len(), parts.len())?;
        for (column, part) in value_columns.iter().zip(parts) {
            fields.insert(column.name.as_str(), part);
        }

        let mut row = Row::with_capacity(table.columns.len());
        for column in &table.columns {
            let text = fields.get(column.name.as_str()).ok_or_else(|| {
                Error::Internal(format!("column '{}' missing after decode", column.name))
            })?;
            row.insert(column.name.clone(), Value::decode(text, &column.data_type));
        }
        Ok(row)
    }

    fn check_arity(table: &TableDef, expected: usize, found: usize) -> Result<()> {
        if expected != found {
            return Err(Error::ArityMismatch {
                table: table.name.clone(),
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Key of `row` in an index over `columns`.
    /// Returns `None` if any indexed column is missing or NULL.
    pub fn index_key(columns: &[String], row: &Row) -> Option<String> {
        let mut parts = Vec::with_capacity(columns.len());
        for column in columns {
            match row.get(column) {
                Some(value) if !value.is_null() => parts.push(value.to_string()),
                _ => return None,
            }
        }
        Some(parts.join(&KEY_DELIMITER.to_string()))
    }

    /// Split an index entry value into the primary keys it lists
    pub fn split_key_list(value: &str) -> Vec<String> {
        value
            .split(VALUE_DELIMITER)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Join primary keys into an index entry value
    pub fn join_key_list(keys: &[String]) -> String {
        keys.join(&VALUE_DELIMITER.to_string())
    }
}

/// Generates identifiers for tables without a declared primary key.
///
/// Keys are fixed-width hex, so they sort in generation order.
#[derive(Debug)]
pub struct KeyGenerator {
    next: AtomicU64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self {
            next: AtomicU64::new(seed),
        }
    }

    pub fn next_key(&self) -> String {
        format!("{:016x}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
