//! Catalog module
//!
//! This module contains the system catalog, schema definitions, column types
//! and catalog persistence.

pub mod catalog;
pub mod schema;
pub mod store;
pub mod types;

pub use catalog::Catalog;
pub use schema::{
    Column, DatabaseDef, ForeignKey, IndexDef, IndexKind, PrimaryKey, TableDef, SYNTHETIC_KEY,
};
pub use store::{CatalogSnapshot, CatalogStore, JsonCatalogFile, MemoryCatalogStore};
pub use types::DataType;
