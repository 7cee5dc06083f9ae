//! DDL execution
//!
//! Database, table and index definitions: validation against the catalog,
//! provisioning of backing collections, and catalog persistence.

use std::collections::HashSet;
use tracing::{debug, info};

use super::engine::{ExecutionEngine, QueryResult, Session};
use super::index::IndexStore;
use crate::catalog::{
    Column, DataType, ForeignKey, IndexDef, IndexKind, PrimaryKey, TableDef,
};
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnModifier, CreateIndexStatement, CreateTableStatement};
use crate::storage::{naming, RowCodec};

impl ExecutionEngine {
    pub(crate) fn execute_create_database(&self, name: &str) -> Result<QueryResult> {
        self.catalog.add_database(name)?;
        self.persist_catalog();
        info!(db = name, "database created");

        Ok(QueryResult::with_message(format!("Database {} created", name)))
    }

    pub(crate) async fn execute_drop_database(
        &self,
        session: &mut Session,
        name: &str,
    ) -> Result<QueryResult> {
        if !self.catalog.has_database(name)? {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }

        for collection in self.store.list_collections(name).await? {
            self.store.drop_collection(name, &collection).await?;
        }
        self.catalog.remove_database(name)?;
        self.persist_catalog();

        if session.current_database() == Some(name) {
            session.clear();
        }
        info!(db = name, "database dropped");

        Ok(QueryResult::with_message(format!("Database {} dropped", name)))
    }

    pub(crate) async fn execute_create_table(
        &self,
        session: &Session,
        stmt: CreateTableStatement,
    ) -> Result<QueryResult> {
        let db = session.require_database()?;
        if self.catalog.find_table(db, &stmt.name).is_ok() {
            return Err(Error::TableAlreadyExists(stmt.name));
        }

        let table = self.build_table(db, &stmt)?;

        self.store.create_collection(db, &table.collection).await?;
        for index in &table.indexes {
            self.store.create_collection(db, &index.collection).await?;
        }

        let table = self.catalog.add_table(db, table)?;
        self.persist_catalog();
        info!(
            db,
            table = %table.name,
            foreign_keys = table.foreign_keys.len(),
            indexes = table.indexes.len(),
            "table created"
        );

        Ok(QueryResult::with_message(format!("Table {} created", table.name)))
    }

    /// Validate a column list and derive the full table definition
    fn build_table(&self, db: &str, stmt: &CreateTableStatement) -> Result<TableDef> {
        if stmt.columns.is_empty() {
            return Err(Error::NoColumns(stmt.name.clone()));
        }

        let mut seen = HashSet::new();
        for def in &stmt.columns {
            if !seen.insert(def.name.as_str()) {
                return Err(Error::DuplicateColumn(def.name.clone(), stmt.name.clone()));
            }
        }

        let mut columns = Vec::with_capacity(stmt.columns.len());
        let mut key_columns = Vec::new();
        let mut references = Vec::new();

        for def in &stmt.columns {
            let data_type = DataType::from_parts(&def.name, &def.type_name, def.length)?;
            let mut unique = false;

            for modifier in &def.modifiers {
                match modifier {
                    ColumnModifier::Primary => {
                        if !key_columns.contains(&def.name) {
                            key_columns.push(def.name.clone());
                        }
                    }
                    ColumnModifier::Unique => unique = true,
                    ColumnModifier::Foreign { table, column } => {
                        self.check_reference(db, stmt, &def.name, table, column)?;
                        references.push((def.name.clone(), table.clone(), column.clone()));
                    }
                    ColumnModifier::Unknown(other) => {
                        return Err(Error::InvalidModifier {
                            column: def.name.clone(),
                            modifier: other.clone(),
                        })
                    }
                }
            }

            columns.push(Column::new(def.name.clone(), data_type).unique(unique));
        }

        let primary_key = if key_columns.is_empty() {
            PrimaryKey::synthetic()
        } else {
            PrimaryKey::declared(key_columns)
        };
        let mut table = TableDef::new(
            stmt.name.clone(),
            naming::table_collection(db, &stmt.name),
            columns,
            primary_key,
        );

        for (column, ref_table, ref_column) in references {
            let fk_columns = vec![column];
            let shadow_index = naming::foreign_key_index_name(&ref_table, &fk_columns);
            if table.get_index(&shadow_index).is_some() {
                continue;
            }
            let collection =
                naming::foreign_key_collection(db, &stmt.name, &ref_table, &fk_columns);

            table.indexes.push(
                IndexDef::new(shadow_index.clone(), fk_columns.clone(), collection)
                    .kind(IndexKind::ForeignKeyShadow),
            );
            table.foreign_keys.push(ForeignKey {
                columns: fk_columns,
                ref_table,
                ref_columns: vec![ref_column],
                shadow_index,
            });
        }

        let unique_columns: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.unique && !table.primary_key.contains(&c.name))
            .map(|c| c.name.clone())
            .collect();
        for column in unique_columns {
            let name = format!("{}_unique", column);
            let collection = naming::index_collection(db, &stmt.name, &name);
            table
                .indexes
                .push(IndexDef::new(name, vec![column], collection).unique(true));
        }

        Ok(table)
    }

    /// A foreign key must target an existing column of an already created
    /// table, or of the table being defined.
    fn check_reference(
        &self,
        db: &str,
        stmt: &CreateTableStatement,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> Result<()> {
        let exists = if ref_table == stmt.name {
            stmt.columns.iter().any(|c| c.name == ref_column)
        } else {
            let target = self.catalog.find_table(db, ref_table).map_err(|_| {
                Error::InvalidForeignKey {
                    column: column.to_string(),
                    target: format!("table {}", ref_table),
                }
            })?;
            target.has_column(ref_column)
        };

        if !exists {
            return Err(Error::InvalidForeignKey {
                column: column.to_string(),
                target: format!("column {}.{}", ref_table, ref_column),
            });
        }
        Ok(())
    }

    pub(crate) async fn execute_drop_table(
        &self,
        session: &Session,
        name: &str,
    ) -> Result<QueryResult> {
        let db = session.require_database()?;
        let table = self.catalog.find_table(db, name)?;

        if !self.catalog.referencing_tables(db, name)?.is_empty() {
            return Err(Error::TableReferenced(name.to_string()));
        }

        for index in &table.indexes {
            self.store.drop_collection(db, &index.collection).await?;
        }
        self.store.drop_collection(db, &table.collection).await?;

        self.catalog.remove_table(db, name)?;
        self.persist_catalog();
        info!(db, table = name, "table dropped");

        Ok(QueryResult::with_message(format!("Table {} dropped", name)))
    }

    pub(crate) async fn execute_create_index(
        &self,
        session: &Session,
        stmt: CreateIndexStatement,
    ) -> Result<QueryResult> {
        let db = session.require_database()?;
        let table = self.catalog.find_table(db, &stmt.table)?;

        let mut seen = HashSet::new();
        for column in &stmt.columns {
            if !table.has_column(column) {
                return Err(Error::ColumnNotFound(column.clone(), table.name.clone()));
            }
            if !seen.insert(column.as_str()) {
                return Err(Error::DuplicateColumn(column.clone(), table.name.clone()));
            }
        }
        if table.get_index(&stmt.name).is_some() {
            return Err(Error::IndexAlreadyExists(stmt.name, table.name.clone()));
        }

        let collection = naming::index_collection(db, &table.name, &stmt.name);
        let index = IndexDef::new(stmt.name.clone(), stmt.columns.clone(), collection)
            .unique(stmt.unique);

        self.store.create_collection(db, &index.collection).await?;

        let mut rows = Vec::new();
        for doc in self.store.find_all(db, &table.collection).await? {
            let row = RowCodec::decode(&table, &doc.id, &doc.value)?;
            rows.push((doc.id, row));
        }
        let indexes = IndexStore::new(self.store.as_ref(), db);
        let entries = match indexes.backfill(&index, &rows).await {
            Ok(entries) => entries,
            Err(e) => {
                self.store.drop_collection(db, &index.collection).await?;
                return Err(e);
            }
        };
        debug!(index = %index.name, entries, "index backfilled");

        self.catalog.add_index(db, &table.name, index)?;
        self.persist_catalog();

        Ok(QueryResult::with_message(format!(
            "Index {} created on column {} in table {} (Unique: {})",
            stmt.name,
            stmt.columns.join(", "),
            table.name,
            stmt.unique
        )))
    }

    pub(crate) fn execute_use(&self, session: &mut Session, name: &str) -> Result<QueryResult> {
        if !self.catalog.has_database(name)? {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }
        session.select(name);

        Ok(QueryResult::with_message(format!("Using database {}", name)))
    }

    pub(crate) fn execute_list_databases(&self) -> Result<QueryResult> {
        let names = self.catalog.list_databases()?;
        if names.is_empty() {
            return Ok(QueryResult::with_message("No databases available."));
        }

        Ok(QueryResult::with_message(format!(
            "Databases:\n{}",
            names.join("\n")
        )))
    }

    pub(crate) fn execute_list_tables(&self, session: &Session) -> Result<QueryResult> {
        let db = session.require_database()?;
        let tables = self.catalog.find_database(db)?;
        if tables.is_empty() {
            return Ok(QueryResult::with_message(format!(
                "No tables in database {}.",
                db
            )));
        }

        let names: Vec<&str> = tables.iter().map(|t| t.name()).collect();
        Ok(QueryResult::with_message(format!(
            "Tables in database {}:\n{}",
            db,
            names.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    async fn setup() -> (ExecutionEngine, Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let engine = ExecutionEngine::new(Arc::new(Catalog::in_memory()), store.clone());
        let mut session = Session::new();
        engine.execute(&mut session, "create database School").await.unwrap();
        engine.execute(&mut session, "use School").await.unwrap();
        (engine, store, session)
    }

    #[tokio::test]
    async fn test_create_table_provisions_collections() {
        let (engine, store, mut session) = setup().await;

        engine
            .execute(&mut session, "create table Students id int primary, email varchar 30 unique")
            .await
            .unwrap();
        engine
            .execute(&mut session, "create table Grades gid int primary, sid int foreign=Students.id, mark float")
            .await
            .unwrap();

        assert_eq!(
            store.list_collections("School").await.unwrap(),
            vec![
                "School_Grades",
                "School_Grades_fk_Students_sid",
                "School_Students",
                "School_Students_idx_email_unique",
            ]
        );

        let grades = engine.catalog().find_table("School", "Grades").unwrap();
        assert_eq!(grades.foreign_keys[0].ref_table, "Students");
        assert_eq!(grades.indexes[0].kind, IndexKind::ForeignKeyShadow);
        assert!(!grades.indexes[0].unique);

        let students = engine.catalog().find_table("School", "Students").unwrap();
        assert!(students.get_index("email_unique").unwrap().unique);
    }

    #[tokio::test]
    async fn test_create_table_validation() {
        let (engine, _, mut session) = setup().await;

        let cases = [
            ("create table T a int, a int", "duplicate"),
            ("create table T a varchar", "length"),
            ("create table T a int 4", "length on int"),
            ("create table T a varchar 0", "zero length"),
            ("create table T a text", "unknown type"),
            ("create table T a int bogus", "unknown modifier"),
            ("create table T", "no columns"),
            ("create table T a int foreign=Missing.id", "unknown table"),
        ];
        for (command, case) in cases {
            let err = engine.execute(&mut session, command).await.unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Validation, "{}", case);
        }
        assert!(engine.catalog().find_database("School").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_key_to_missing_column() {
        let (engine, _, mut session) = setup().await;
        engine
            .execute(&mut session, "create table Students id int primary, name varchar 20")
            .await
            .unwrap();

        let err = engine
            .execute(&mut session, "create table Grades sid int foreign=Students.code, g int")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidForeignKey { .. }));
    }

    #[tokio::test]
    async fn test_self_reference_blocks_drop() {
        let (engine, _, mut session) = setup().await;
        engine
            .execute(&mut session, "create table Staff id int primary, boss int foreign=Staff.id")
            .await
            .unwrap();

        assert!(matches!(
            engine.execute(&mut session, "drop table Staff").await,
            Err(Error::TableReferenced(_))
        ));
    }

    #[tokio::test]
    async fn test_drop_table_and_database() {
        let (engine, store, mut session) = setup().await;
        engine
            .execute(&mut session, "create table Students id int primary, name varchar 20 unique")
            .await
            .unwrap();
        engine
            .execute(&mut session, "create table Grades sid int foreign=Students.id")
            .await
            .unwrap();

        assert!(matches!(
            engine.execute(&mut session, "drop table Students").await,
            Err(Error::TableReferenced(_))
        ));
        engine.execute(&mut session, "drop table Grades").await.unwrap();
        engine.execute(&mut session, "drop table Students").await.unwrap();
        assert!(store.list_collections("School").await.unwrap().is_empty());

        engine
            .execute(&mut session, "create table Rooms id int primary")
            .await
            .unwrap();
        let result = engine.execute(&mut session, "drop database School").await.unwrap();
        assert_eq!(result.message.as_deref(), Some("Database School dropped"));
        assert_eq!(session.current_database(), None);
        assert!(store.list_collections("School").await.unwrap().is_empty());
        assert!(!engine.catalog().has_database("School").unwrap());
    }

    #[tokio::test]
    async fn test_create_index_backfills() {
        let (engine, store, mut session) = setup().await;
        engine
            .execute(&mut session, "create table Students id int primary, name varchar 20")
            .await
            .unwrap();
        engine
            .execute(&mut session, "insert into Students id=1, name='Ann'")
            .await
            .unwrap();
        engine
            .execute(&mut session, "insert into Students id=2, name='Ann'")
            .await
            .unwrap();

        let err = engine
            .execute(&mut session, "create unique index by_name on Students name")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UniqueViolation { .. }));
        assert!(!store
            .list_collections("School")
            .await
            .unwrap()
            .contains(&"School_Students_idx_by_name".to_string()));

        engine
            .execute(&mut session, "create index by_name on Students name")
            .await
            .unwrap();
        let entries = store
            .find_all("School", "School_Students_idx_by_name")
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, "1#2");

        assert!(matches!(
            engine
                .execute(&mut session, "create index by_name on Students id")
                .await,
            Err(Error::IndexAlreadyExists(..))
        ));
        assert!(matches!(
            engine
                .execute(&mut session, "create index other on Students nope")
                .await,
            Err(Error::ColumnNotFound(..))
        ));
    }
}
