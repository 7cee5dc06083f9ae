//! Schema definitions for docrel
//!
//! This module defines table, column, key and index metadata.

use super::types::DataType;
use serde::{Deserialize, Serialize};

/// Name of the hidden key column used when a table declares no primary key
pub const SYNTHETIC_KEY: &str = "_id";

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Is this column unique?
    pub unique: bool,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            unique: false,
        }
    }

    /// Set unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

/// Primary key of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Key columns in declaration order
    pub columns: Vec<String>,
    /// True when the key is the generated [`SYNTHETIC_KEY`] rather than declared columns
    pub synthetic: bool,
}

impl PrimaryKey {
    /// Key made of declared columns
    pub fn declared(columns: Vec<String>) -> Self {
        Self {
            columns,
            synthetic: false,
        }
    }

    /// Generated key for tables without a `primary` column
    pub fn synthetic() -> Self {
        Self {
            columns: vec![SYNTHETIC_KEY.to_string()],
            synthetic: true,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        !self.synthetic && self.columns.iter().any(|c| c == column)
    }
}

/// Foreign key from columns of this table to columns of another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing columns in this table
    pub columns: Vec<String>,
    /// Referenced table
    pub ref_table: String,
    /// Referenced columns, positionally matching `columns`
    pub ref_columns: Vec<String>,
    /// Name of the shadow index that tracks referencing rows
    pub shadow_index: String,
}

/// Which family an index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Declared with `create index` or implied by a `unique` column
    Secondary,
    /// Maintained alongside a foreign key; never unique
    ForeignKeyShadow,
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name, unique per table
    pub name: String,
    /// Indexed columns; order matters for composite keys
    pub columns: Vec<String>,
    /// Is this a unique index?
    pub unique: bool,
    /// Index family
    pub kind: IndexKind,
    /// Backing collection holding the index entries
    pub collection: String,
}

impl IndexDef {
    /// Create a new secondary index definition
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            kind: IndexKind::Secondary,
            collection: collection.into(),
        }
    }

    /// Set unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set the index family
    pub fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// True if this index is keyed by exactly one column with the given name
    pub fn covers_single(&self, column: &str) -> bool {
        self.columns.len() == 1 && self.columns[0] == column
    }
}

/// Table definition - full table metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Backing collection holding the rows
    pub collection: String,
    /// Ordered list of columns
    pub columns: Vec<Column>,
    /// Primary key
    pub primary_key: PrimaryKey,
    /// Foreign keys declared by this table
    pub foreign_keys: Vec<ForeignKey>,
    /// Secondary and foreign-key shadow indexes
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(
        name: impl Into<String>,
        collection: impl Into<String>,
        columns: Vec<Column>,
        primary_key: PrimaryKey,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            columns,
            primary_key,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns stored in the value blob: every column not in the primary key, in table order
    pub fn value_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| !self.primary_key.contains(&c.name))
            .collect()
    }

    /// Get index by name
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// True if `columns` are exactly the declared primary key, in order
    pub fn is_primary_key(&self, columns: &[String]) -> bool {
        !self.primary_key.synthetic && self.primary_key.columns == columns
    }

    /// True if lookups on `column` alone can be answered without scanning:
    /// it is the whole primary key, or the sole column of an index.
    pub fn is_indexed(&self, column: &str) -> bool {
        self.is_primary_key(&[column.to_string()])
            || self.indexes.iter().any(|i| i.covers_single(column))
    }

    /// Foreign keys of this table that point at `table`
    pub fn references_to<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ForeignKey> {
        self.foreign_keys.iter().filter(move |fk| fk.ref_table == table)
    }
}

/// A database: a named, ordered set of tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDef {
    /// Database name
    pub name: String,
    /// Tables in creation order
    pub tables: Vec<TableDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn students() -> TableDef {
        let mut table = TableDef::new(
            "Students",
            "School_Students",
            vec![
                Column::new("id", DataType::Int),
                Column::new("name", DataType::Varchar(20)),
                Column::new("email", DataType::Varchar(40)).unique(true),
            ],
            PrimaryKey::declared(vec!["id".to_string()]),
        );
        table.indexes.push(
            IndexDef::new(
                "email_unique",
                vec!["email".to_string()],
                "School_Students_idx_email_unique",
            )
            .unique(true),
        );
        table
    }

    #[test]
    fn test_value_columns_skip_key() {
        let table = students();
        let names: Vec<&str> = table.value_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "email"]);
    }

    #[test]
    fn test_synthetic_key_stores_every_column() {
        let table = TableDef::new(
            "Log",
            "db_Log",
            vec![Column::new("msg", DataType::Varchar(10))],
            PrimaryKey::synthetic(),
        );
        assert_eq!(table.value_columns().len(), 1);
        assert!(!table.is_primary_key(&[SYNTHETIC_KEY.to_string()]));
    }

    #[test]
    fn test_is_indexed() {
        let table = students();
        assert!(table.is_indexed("id"));
        assert!(table.is_indexed("email"));
        assert!(!table.is_indexed("name"));
    }
}
