//! INSERT and DELETE execution
//!
//! Every constraint is checked before the row is written. The row write and
//! the index writes that follow it are separate store calls and are not
//! rolled back if a later one fails.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::engine::{ExecutionEngine, QueryResult, Session};
use super::index::IndexStore;
use crate::catalog::{ForeignKey, TableDef};
use crate::error::{Error, Result};
use crate::sql::ast::{CompareOp, DeleteStatement, InsertStatement, Literal};
use crate::storage::{Document, Row, RowCodec, Value};

impl ExecutionEngine {
    pub(crate) async fn execute_insert(
        &self,
        session: &Session,
        stmt: InsertStatement,
    ) -> Result<QueryResult> {
        let db = session.require_database()?;
        let table = self.catalog.find_table(db, &stmt.table)?;

        let row = build_row(&table, &stmt.assignments)?;

        let pk = if table.primary_key.synthetic {
            self.keys.next_key()
        } else {
            let key = RowCodec::encode_key(&table, &row)?;
            if self
                .store
                .find_by_id(db, &table.collection, &key)
                .await?
                .is_some()
            {
                return Err(Error::DuplicatePrimaryKey {
                    table: table.name.clone(),
                    key,
                });
            }
            key
        };

        for fk in &table.foreign_keys {
            self.check_foreign_key(db, &table, fk, &row).await?;
        }

        let indexes = IndexStore::new(self.store.as_ref(), db);
        indexes.check_unique(&table, &row).await?;

        let value = RowCodec::encode_value(&table, &row)?;
        self.store
            .insert(db, &table.collection, Document::new(pk.clone(), value))
            .await?;
        indexes.insert_row(&table, &pk, &row).await?;
        debug!(db, table = %table.name, pk = %pk, "row inserted");

        Ok(QueryResult::with_affected_rows(
            1,
            format!("Inserted into table {}", table.name),
        ))
    }

    /// The row's foreign-key values must name an existing row of the referenced table
    async fn check_foreign_key(
        &self,
        db: &str,
        table: &TableDef,
        fk: &ForeignKey,
        row: &Row,
    ) -> Result<()> {
        let Some(key) = RowCodec::index_key(&fk.columns, row) else {
            return Ok(());
        };

        // A row may reference itself
        if fk.ref_table == table.name
            && fk
                .columns
                .iter()
                .zip(&fk.ref_columns)
                .all(|(c, r)| row.get(c) == row.get(r))
        {
            return Ok(());
        }

        let target = self.catalog.find_table(db, &fk.ref_table)?;
        let found = if target.is_primary_key(&fk.ref_columns) {
            self.store
                .find_by_id(db, &target.collection, &key)
                .await?
                .is_some()
        } else if let Some(index) = target
            .indexes
            .iter()
            .find(|i| i.unique && i.columns == fk.ref_columns)
        {
            let indexes = IndexStore::new(self.store.as_ref(), db);
            !indexes.lookup(index, &key).await?.is_empty()
        } else {
            let mut found = false;
            for doc in self.store.find_all(db, &target.collection).await? {
                let candidate = RowCodec::decode(&target, &doc.id, &doc.value)?;
                if RowCodec::index_key(&fk.ref_columns, &candidate).as_deref() == Some(key.as_str()) {
                    found = true;
                    break;
                }
            }
            found
        };

        if !found {
            return Err(Error::ForeignKeyViolation {
                table: fk.ref_table.clone(),
                key,
            });
        }
        Ok(())
    }

    pub(crate) async fn execute_delete(
        &self,
        session: &Session,
        stmt: DeleteStatement,
    ) -> Result<QueryResult> {
        let db = session.require_database()?;
        let table = self.catalog.find_table(db, &stmt.table)?;

        let key_row = key_conditions(&table, &stmt)?;
        let key = RowCodec::encode_key(&table, &key_row)?;

        let doc = self
            .store
            .find_by_id(db, &table.collection, &key)
            .await?
            .ok_or(Error::RowNotFound)?;
        let row = RowCodec::decode(&table, &doc.id, &doc.value)?;

        let indexes = IndexStore::new(self.store.as_ref(), db);
        let mut referencing = Vec::new();
        for other in self.catalog.referencing_tables(db, &table.name)? {
            for fk in other.references_to(&table.name) {
                let Some(ref_key) = RowCodec::index_key(&fk.ref_columns, &row) else {
                    continue;
                };
                let Some(shadow) = other.get_index(&fk.shadow_index) else {
                    continue;
                };
                let holders = indexes.lookup(shadow, &ref_key).await?;
                let self_only = other.name == table.name && holders.iter().all(|h| h == &key);
                if !holders.is_empty() && !self_only {
                    referencing.push(other.name.clone());
                    break;
                }
            }
        }
        if !referencing.is_empty() {
            return Err(Error::RowReferenced {
                table: table.name.clone(),
                key,
                referencing: referencing.join(", "),
            });
        }

        indexes.delete_row(&table, &key, &row).await?;
        if self.store.delete_by_id(db, &table.collection, &key).await? == 0 {
            return Err(Error::RowNotFound);
        }
        info!(db, table = %table.name, pk = %key, "row deleted");

        Ok(QueryResult::with_affected_rows(
            1,
            format!("Deleted from table {}", table.name),
        ))
    }
}

/// Check an assignment list against the table and coerce it to a typed row
fn build_row(table: &TableDef, assignments: &[(String, Literal)]) -> Result<Row> {
    let mut provided: HashMap<&str, &Literal> = HashMap::new();
    for (column, literal) in assignments {
        if provided.insert(column.as_str(), literal).is_some() {
            return Err(Error::DuplicateAssignment(column.clone()));
        }
    }

    let missing: Vec<&str> = table
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| !provided.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing.join(", ")));
    }

    let extra: Vec<&str> = assignments
        .iter()
        .map(|(column, _)| column.as_str())
        .filter(|name| !table.has_column(name))
        .collect();
    if !extra.is_empty() {
        return Err(Error::ExtraColumns(extra.join(", ")));
    }

    for column in &table.columns {
        if let Some(literal) = provided.get(column.name.as_str()) {
            Value::check_quoted(literal, column)?;
        }
    }

    let mut row = Row::with_capacity(table.columns.len());
    for column in &table.columns {
        let literal = provided
            .get(column.name.as_str())
            .ok_or_else(|| Error::MissingColumns(column.name.clone()))?;
        row.insert(column.name.clone(), Value::from_literal(literal, column)?);
    }
    Ok(row)
}

/// Validate a delete's `where` clause: exactly one `=` condition per
/// primary-key column. Returns the key columns as a typed row.
fn key_conditions(table: &TableDef, stmt: &DeleteStatement) -> Result<Row> {
    if stmt.conditions.is_empty() {
        return Err(Error::MissingWhereClause);
    }

    let mut seen = HashSet::new();
    let mut key_row = Row::new();
    for condition in &stmt.conditions {
        let name = &condition.column.name;
        if let Some(qualifier) = &condition.column.qualifier {
            if qualifier != &table.name {
                return Err(Error::UnknownAlias(qualifier.clone()));
            }
        }

        let column = table
            .get_column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.clone(), table.name.clone()))?;
        if condition.op != CompareOp::Eq {
            return Err(Error::UnsupportedDeleteOperator(name.clone()));
        }
        if !table.primary_key.contains(name) {
            return Err(Error::NonKeyCondition(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(Error::DuplicateCondition(name.clone()));
        }

        let text = condition.value.text();
        let value = Value::parse(&text, &column.data_type).ok_or_else(|| Error::TypeMismatch {
            column: name.clone(),
            data_type: column.data_type.to_string(),
            value: text.clone(),
        })?;
        key_row.insert(name.clone(), value);
    }

    let missing: Vec<&str> = table
        .primary_key
        .columns
        .iter()
        .map(String::as_str)
        .filter(|c| !seen.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingKeyColumns(missing.join(", ")));
    }

    Ok(key_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::ErrorKind;
    use crate::storage::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    async fn school() -> (ExecutionEngine, Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let engine = ExecutionEngine::new(Arc::new(Catalog::in_memory()), store.clone());
        let mut session = Session::new();
        for command in [
            "create database School",
            "use School",
            "create table Students id int primary, name varchar 20, email varchar 30 unique",
            "create table Enroll course varchar 10 primary, sid int primary foreign=Students.id, grade float",
        ] {
            engine.execute(&mut session, command).await.unwrap();
        }
        (engine, store, session)
    }

    #[tokio::test]
    async fn test_insert_writes_row_and_indexes() {
        let (engine, store, mut session) = school().await;

        let result = engine
            .execute(&mut session, "insert into Students id=1, name='Ann', email='ann@x'")
            .await
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.message.as_deref(), Some("Inserted into table Students"));

        assert_eq!(
            store.find_by_id("School", "School_Students", "1").await.unwrap(),
            Some(Document::new("1", "Ann#ann@x"))
        );
        assert_eq!(
            store
                .find_by_id("School", "School_Students_idx_email_unique", "ann@x")
                .await
                .unwrap(),
            Some(Document::new("ann@x", "1"))
        );

        engine
            .execute(&mut session, "insert into Enroll course='db', sid=1, grade=9.5")
            .await
            .unwrap();
        assert_eq!(
            store.find_by_id("School", "School_Enroll", "db$1").await.unwrap(),
            Some(Document::new("db$1", "9.5"))
        );
        assert_eq!(
            store
                .find_by_id("School", "School_Enroll_fk_Students_sid", "1")
                .await
                .unwrap(),
            Some(Document::new("1", "db$1"))
        );
    }

    #[tokio::test]
    async fn test_insert_validation_order() {
        let (engine, _, mut session) = school().await;

        let cases: [(&str, fn(&Error) -> bool); 7] = [
            ("insert into Students id=1, id=2, name='A', email='a'", |e| {
                matches!(e, Error::DuplicateAssignment(_))
            }),
            ("insert into Students id=1, name='A'", |e| {
                matches!(e, Error::MissingColumns(c) if c == "email")
            }),
            ("insert into Students id=1, name='A', email='a', age=3", |e| {
                matches!(e, Error::ExtraColumns(c) if c == "age")
            }),
            ("insert into Students id=1, name=Ann, email='a'", |e| {
                matches!(e, Error::UnquotedString { .. })
            }),
            ("insert into Students id=one, name='A', email='a'", |e| {
                matches!(e, Error::TypeMismatch { .. })
            }),
            ("insert into Students id=one, name=Ann, email='a'", |e| {
                matches!(e, Error::UnquotedString { column, .. } if column == "name")
            }),
            ("insert into Students id=1, name='A$B', email='a'", |e| {
                matches!(e, Error::ReservedCharacter(_))
            }),
        ];
        for (command, expected) in cases {
            let err = engine.execute(&mut session, command).await.unwrap_err();
            assert!(expected(&err), "{}: {}", command, err);
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_constraints() {
        let (engine, store, mut session) = school().await;
        engine
            .execute(&mut session, "insert into Students id=1, name='Ann', email='a'")
            .await
            .unwrap();

        let err = engine
            .execute(&mut session, "insert into Students id=1, name='Bob', email='b'")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePrimaryKey { .. }));

        let err = engine
            .execute(&mut session, "insert into Students id=2, name='Bob', email='a'")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UniqueViolation { .. }));

        let err = engine
            .execute(&mut session, "insert into Enroll course='db', sid=7, grade=1.0")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation { .. }));
        assert_eq!(err.kind(), ErrorKind::Constraint);

        assert_eq!(store.find_all("School", "School_Students").await.unwrap().len(), 1);
        assert!(store.find_all("School", "School_Enroll").await.unwrap().is_empty());
        assert!(store
            .find_all("School", "School_Enroll_fk_Students_sid")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_primary_key() {
        let (engine, store, mut session) = school().await;
        engine
            .execute(&mut session, "insert into Students id=1, name='Ann', email='a'")
            .await
            .unwrap();
        engine
            .execute(&mut session, "insert into Enroll course='db', sid=1, grade=8")
            .await
            .unwrap();

        let err = engine
            .execute(&mut session, "delete from Students where id = 1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RowReferenced { ref referencing, .. } if referencing == "Enroll"));

        let cases: [(&str, fn(&Error) -> bool); 6] = [
            ("delete from Enroll", |e| matches!(e, Error::MissingWhereClause)),
            ("delete from Enroll where grade = 8", |e| matches!(e, Error::NonKeyCondition(_))),
            ("delete from Enroll where sid > 0", |e| {
                matches!(e, Error::UnsupportedDeleteOperator(_))
            }),
            ("delete from Enroll where sid = 1 and sid = 1", |e| {
                matches!(e, Error::DuplicateCondition(_))
            }),
            ("delete from Enroll where sid = 1", |e| matches!(e, Error::MissingKeyColumns(_))),
            ("delete from Enroll where course = 'os' and sid = 1", |e| {
                matches!(e, Error::RowNotFound)
            }),
        ];
        for (command, expected) in cases {
            let err = engine.execute(&mut session, command).await.unwrap_err();
            assert!(expected(&err), "{}: {}", command, err);
        }

        let result = engine
            .execute(&mut session, "delete from Enroll where sid = 1 and course = 'db'")
            .await
            .unwrap();
        assert_eq!(result.message.as_deref(), Some("Deleted from table Enroll"));
        assert!(store
            .find_all("School", "School_Enroll_fk_Students_sid")
            .await
            .unwrap()
            .is_empty());

        engine
            .execute(&mut session, "delete from Students where id = 1")
            .await
            .unwrap();
        assert!(store
            .find_all("School", "School_Students_idx_email_unique")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_written_row() {
        let (engine, store, mut session) = school().await;
        store.fail_writes_to("School_Students_idx_email_unique");

        let err = engine
            .execute(&mut session, "insert into Students id=1, name='Ann', email='a'")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(store
            .find_by_id("School", "School_Students", "1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_self_reference() {
        let (engine, _, mut session) = school().await;
        engine
            .execute(&mut session, "create table Staff id int primary, boss int foreign=Staff.id")
            .await
            .unwrap();

        engine
            .execute(&mut session, "insert into Staff id=1, boss=1")
            .await
            .unwrap();
        engine
            .execute(&mut session, "insert into Staff id=2, boss=1")
            .await
            .unwrap();
        assert!(engine
            .execute(&mut session, "insert into Staff id=3, boss=9")
            .await
            .is_err());

        assert!(engine
            .execute(&mut session, "delete from Staff where id = 1")
            .await
            .is_err());
        engine
            .execute(&mut session, "delete from Staff where id = 2")
            .await
            .unwrap();
        engine
            .execute(&mut session, "delete from Staff where id = 1")
            .await
            .unwrap();
    }
}
