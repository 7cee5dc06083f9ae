//! Backing collection names
//!
//! Tables live in `{db}_{table}`, declared indexes in `{db}_{table}_idx_{index}`
//! and foreign-key shadow indexes in `{db}_{table}_fk_{refTable}_{columns}`.

/// Collection holding the rows of a table
pub fn table_collection(db: &str, table: &str) -> String {
    format!("{}_{}", db, table)
}

/// Collection holding the entries of a declared index
pub fn index_collection(db: &str, table: &str, index: &str) -> String {
    format!("{}_idx_{}", table_collection(db, table), index)
}

/// Name of the shadow index kept for a foreign key
pub fn foreign_key_index_name(ref_table: &str, columns: &[String]) -> String {
    format!("fk_{}_{}", ref_table, columns.join("_"))
}

/// Collection holding the entries of a foreign-key shadow index
pub fn foreign_key_collection(db: &str, table: &str, ref_table: &str, columns: &[String]) -> String {
    format!(
        "{}_{}",
        table_collection(db, table),
        foreign_key_index_name(ref_table, columns)
    )
}
