//! Abstract Syntax Tree for commands
//!
//! This module defines the typed form of every command the engine accepts.

use std::fmt;

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateDatabase(String),
    DropDatabase(String),
    CreateTable(CreateTableStatement),
    DropTable(String),
    CreateIndex(CreateIndexStatement),
    Use(String),
    ListDatabases,
    ListTables,
    Insert(InsertStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
}

/// A literal value as written in a command
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    /// Single-quoted string
    String(String),
    /// Bare word such as `true`
    Word(String),
}

impl Literal {
    /// The literal's text with any quotes removed
    pub fn text(&self) -> String {
        match self {
            Literal::Integer(n) => n.to_string(),
            Literal::Float(n) => n.to_string(),
            Literal::String(s) | Literal::Word(s) => s.clone(),
        }
    }

    /// Was the literal single-quoted?
    pub fn is_quoted(&self) -> bool {
        matches!(self, Literal::String(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other.text()),
        }
    }
}

// ========== DDL ==========

/// `create table <name> <column defs>`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

/// One `name type [length] [modifiers...]` column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: String,
    pub length: Option<i64>,
    pub modifiers: Vec<ColumnModifier>,
}

/// Column modifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnModifier {
    Primary,
    Unique,
    Foreign { table: String, column: String },
    /// Anything else; rejected during validation
    Unknown(String),
}

/// `create [unique] index <name> on <table> <columns>`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

// ========== DML ==========

/// `insert into <table> col = value, ...`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub assignments: Vec<(String, Literal)>,
}

/// `delete from <table> where <conditions>`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub conditions: Vec<Condition>,
}

/// Possibly alias-qualified column reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Comparison operators usable in `where` and `having`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
        };
        write!(f, "{}", s)
    }
}

/// `column <op> literal`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ColumnRef,
    pub op: CompareOp,
    pub value: Literal,
}

// ========== SELECT ==========

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "count" => Some(AggregateFunc::Count),
            "sum" => Some(AggregateFunc::Sum),
            "avg" => Some(AggregateFunc::Avg),
            "max" => Some(AggregateFunc::Max),
            "min" => Some(AggregateFunc::Min),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Avg => "avg",
            AggregateFunc::Max => "max",
            AggregateFunc::Min => "min",
        };
        write!(f, "{}", s)
    }
}

/// `func(column)` or `count(*)` when `arg` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregate {
    pub func: AggregateFunc,
    pub arg: Option<ColumnRef>,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(column) => write!(f, "{}({})", self.func, column),
            None => write!(f, "{}(*)", self.func),
        }
    }
}

/// Item of the select list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    Column(ColumnRef),
    Aggregate(Aggregate),
}

/// Table in `from` or `join`, with optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// Name the table is referred to by in the rest of the query
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
        };
        write!(f, "{}", s)
    }
}

/// `<type> join <table> on l = r [and ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Vec<(ColumnRef, ColumnRef)>,
}

/// `having <aggregate> <op> <literal>`
#[derive(Debug, Clone, PartialEq)]
pub struct HavingCondition {
    pub aggregate: Aggregate,
    pub op: CompareOp,
    pub value: Literal,
}

/// `order by` key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: ColumnRef,
    pub descending: bool,
}

/// A SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Vec<Condition>,
    pub group_by: Vec<ColumnRef>,
    pub having: Vec<HavingCondition>,
    pub order_by: Vec<OrderByItem>,
}

impl SelectStatement {
    /// Aggregates used anywhere in the select list
    pub fn aggregates(&self) -> impl Iterator<Item = &Aggregate> {
        self.items.iter().filter_map(|item| match item {
            SelectItem::Aggregate(agg) => Some(agg),
            _ => None,
        })
    }

    /// Does this query group rows?
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty() || !self.having.is_empty() || self.aggregates().next().is_some()
    }
}
