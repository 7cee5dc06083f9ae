//! Execution engine for docrel
//!
//! This module owns the shared catalog and document store, and routes parsed
//! commands to the DDL, DML and query executors.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::sql::{Parser, Statement};
use crate::storage::{DocumentStore, KeyGenerator, Value};

/// Per-connection state
#[derive(Debug, Clone, Default)]
pub struct Session {
    current_database: Option<String>,
}

impl Session {
    /// Create a session with no database selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the selected database, if any
    pub fn current_database(&self) -> Option<&str> {
        self.current_database.as_deref()
    }

    /// The selected database, or [`Error::NoDatabaseSelected`]
    pub fn require_database(&self) -> Result<&str> {
        self.current_database().ok_or(Error::NoDatabaseSelected)
    }

    pub(crate) fn select(&mut self, db: impl Into<String>) {
        self.current_database = Some(db.into());
    }

    pub(crate) fn clear(&mut self) {
        self.current_database = None;
    }
}

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Vec<Value>>,
    /// Number of affected rows (for INSERT/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Message reported by a query that matched nothing
    pub const NO_RESULTS: &'static str = "No results found.";

    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Materialized query output; an empty row set carries the "no results" message
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let message = rows.is_empty().then(|| Self::NO_RESULTS.to_string());
        Self {
            columns,
            rows,
            affected_rows: 0,
            message,
        }
    }

    /// True if this result holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Execution Engine
///
/// One engine is shared by every connection. Commands from different sessions
/// interleave freely: there is no locking between a constraint check and the
/// write that follows it.
pub struct ExecutionEngine {
    /// System catalog
    pub(crate) catalog: Arc<Catalog>,
    /// Backend holding rows and index entries
    pub(crate) store: Arc<dyn DocumentStore>,
    /// Generator for synthetic row keys
    pub(crate) keys: KeyGenerator,
    /// Whether SELECT may use indexes at all
    pub(crate) use_indexes: bool,
}

impl ExecutionEngine {
    /// Create a new execution engine
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            catalog,
            store,
            keys: KeyGenerator::new(),
            use_indexes: true,
        }
    }

    /// Enable or disable index-assisted access paths and joins
    pub fn use_indexes(mut self, enabled: bool) -> Self {
        self.use_indexes = enabled;
        self
    }

    /// The shared catalog
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The backing document store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Parse and execute one command
    pub async fn execute(&self, session: &mut Session, command: &str) -> Result<QueryResult> {
        let statement = Parser::parse_command(command)?;
        self.execute_statement(session, statement).await
    }

    /// Execute an already parsed statement
    pub async fn execute_statement(
        &self,
        session: &mut Session,
        statement: Statement,
    ) -> Result<QueryResult> {
        debug!(db = ?session.current_database(), statement = ?statement, "executing");

        match statement {
            Statement::CreateDatabase(name) => self.execute_create_database(&name),
            Statement::DropDatabase(name) => self.execute_drop_database(session, &name).await,
            Statement::CreateTable(stmt) => self.execute_create_table(session, stmt).await,
            Statement::DropTable(name) => self.execute_drop_table(session, &name).await,
            Statement::CreateIndex(stmt) => self.execute_create_index(session, stmt).await,
            Statement::Use(name) => self.execute_use(session, &name),
            Statement::ListDatabases => self.execute_list_databases(),
            Statement::ListTables => self.execute_list_tables(session),
            Statement::Insert(stmt) => self.execute_insert(session, stmt).await,
            Statement::Delete(stmt) => self.execute_delete(session, stmt).await,
            Statement::Select(stmt) => self.execute_select(session, stmt).await,
        }
    }

    /// Write the catalog after a structural change.
    /// The in-memory catalog stays authoritative when this fails.
    pub(crate) fn persist_catalog(&self) {
        if let Err(e) = self.catalog.persist() {
            warn!(error = %e, "failed to persist catalog");
        }
    }
}
