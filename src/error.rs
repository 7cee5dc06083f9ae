//! Error types for docrel
//!
//! Every failure a command can produce is a variant of [`Error`]. Variants are
//! grouped by the stage that raises them, and [`Error::kind`] folds them into the
//! coarse taxonomy reported to clients.

use thiserror::Error;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed command text; nothing was executed
    Syntax,
    /// Unknown or duplicate names, type and modifier violations
    Validation,
    /// Key, uniqueness or referential integrity violations
    Constraint,
    /// The document store rejected an operation
    Backend,
    /// Invariant breakage inside the engine
    Internal,
}

/// The main error type for docrel
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Session Errors ==========
    #[error("No database selected")]
    NoDatabaseSelected,

    // ========== Catalog Errors ==========
    #[error("Catalog error: database '{0}' does not exist")]
    DatabaseNotFound(String),

    #[error("Catalog error: database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Catalog error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Catalog error: column '{0}' is declared more than once in table '{1}'")]
    DuplicateColumn(String, String),

    #[error("Catalog error: table '{0}' must declare at least one column")]
    NoColumns(String),

    #[error("Catalog error: invalid type for column '{column}': {reason}")]
    InvalidType { column: String, reason: String },

    #[error("Catalog error: invalid modifier '{modifier}' on column '{column}'")]
    InvalidModifier { column: String, modifier: String },

    #[error("Catalog error: foreign key on '{column}' references unknown {target}")]
    InvalidForeignKey { column: String, target: String },

    #[error("Catalog error: index '{0}' already exists on table '{1}'")]
    IndexAlreadyExists(String, String),

    #[error("The following columns do not exist in table(s) {tables}: {columns}")]
    UnknownColumns { tables: String, columns: String },

    #[error("Column reference '{0}' is ambiguous")]
    AmbiguousColumn(String),

    #[error("Unknown table or alias '{0}'")]
    UnknownAlias(String),

    #[error("Table or alias '{0}' is used more than once; give each occurrence a distinct alias")]
    DuplicateAlias(String),

    #[error("Join condition '{0}' must compare a column of the joined table with an earlier one")]
    InvalidJoinCondition(String),

    // ========== Insert Validation Errors ==========
    #[error("Column '{0}' is assigned more than once")]
    DuplicateAssignment(String),

    #[error("Missing column(s): {0}")]
    MissingColumns(String),

    #[error("Extra column(s): {0}")]
    ExtraColumns(String),

    #[error("Column {column} of type {data_type} must be enclosed in single quotes.")]
    UnquotedString { column: String, data_type: String },

    #[error("Invalid value '{value}' for column {column} of type {data_type}")]
    TypeMismatch {
        column: String,
        data_type: String,
        value: String,
    },

    #[error("Value for column {column} exceeds the declared length {length}")]
    ValueTooLong { column: String, length: usize },

    #[error("Value for column {0} contains a reserved character ('$' or '#')")]
    ReservedCharacter(String),

    // ========== Delete Validation Errors ==========
    #[error("Delete requires a where clause on the primary key")]
    MissingWhereClause,

    #[error("Column '{0}' is not part of the primary key; rows can only be deleted by primary key")]
    NonKeyCondition(String),

    #[error("Only '=' conditions are allowed when deleting (column '{0}')")]
    UnsupportedDeleteOperator(String),

    #[error("Column '{0}' appears in more than one condition")]
    DuplicateCondition(String),

    #[error("Missing primary key column(s) in where clause: {0}")]
    MissingKeyColumns(String),

    // ========== Constraint Errors ==========
    #[error("Duplicate primary key '{key}' in table {table}")]
    DuplicatePrimaryKey { table: String, key: String },

    #[error("Foreign key constraint violation. No record found in table {table} with key '{key}'")]
    ForeignKeyViolation { table: String, key: String },

    #[error("Unique index {index} already contains the value '{value}'")]
    UniqueViolation { index: String, value: String },

    #[error("Table '{table}' with id '{key}' is referenced in the following tables: {referencing}")]
    RowReferenced {
        table: String,
        key: String,
        referencing: String,
    },

    #[error("Cannot drop table {0}, it is referenced by other tables")]
    TableReferenced(String),

    #[error("No data found with the given primary key")]
    RowNotFound,

    // ========== Codec Errors ==========
    #[error("Codec error: table '{table}' expects {expected} value(s), found {found}")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    // ========== Backend Errors ==========
    #[error("Storage error: operation failed: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Config(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            UnexpectedCharacter(..)
            | UnterminatedString(_)
            | InvalidNumber(_)
            | UnexpectedToken { .. }
            | UnexpectedEof(_)
            | ParseError(_) => ErrorKind::Syntax,

            DuplicatePrimaryKey { .. }
            | ForeignKeyViolation { .. }
            | UniqueViolation { .. }
            | RowReferenced { .. }
            | TableReferenced(_)
            | RowNotFound => ErrorKind::Constraint,

            Storage(_) | IoError(_) | Serialization(_) => ErrorKind::Backend,

            ArityMismatch { .. } | Internal(_) => ErrorKind::Internal,

            _ => ErrorKind::Validation,
        }
    }
}

/// Result type alias for docrel operations
pub type Result<T> = std::result::Result<T, Error>;
