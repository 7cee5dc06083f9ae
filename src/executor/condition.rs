//! Condition evaluation
//!
//! A `where` condition is compiled once against the column it names: the
//! literal is coerced to the column's type and LIKE patterns become anchored,
//! case-insensitive regular expressions.

use regex::Regex;
use std::cmp::Ordering;

use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::sql::ast::{CompareOp, Literal};
use crate::storage::{Row, Value};

/// A compiled `column <op> value` test
#[derive(Debug, Clone)]
pub struct Predicate {
    /// Table binding (alias or table name) the column belongs to
    pub binding: String,
    /// Column name within the table
    pub column: String,
    pub op: CompareOp,
    /// Right-hand side, coerced to the column type (text for LIKE)
    pub value: Value,
    pattern: Option<Regex>,
}

impl Predicate {
    /// Compile a condition on `binding.column`, a column of type `data_type`
    pub fn compile(
        binding: impl Into<String>,
        column: impl Into<String>,
        data_type: &DataType,
        op: CompareOp,
        literal: &Literal,
    ) -> Result<Self> {
        let column = column.into();
        let text = literal.text();

        let (value, pattern) = if op == CompareOp::Like {
            let pattern = like_pattern(&text)?;
            (Value::Text(text), Some(pattern))
        } else {
            let value = Value::parse(&text, data_type).ok_or_else(|| Error::TypeMismatch {
                column: column.clone(),
                data_type: data_type.to_string(),
                value: text.clone(),
            })?;
            (value, None)
        };

        Ok(Self {
            binding: binding.into(),
            column,
            op,
            value,
            pattern,
        })
    }

    /// Key of the tested column in a qualified row
    pub fn key(&self) -> String {
        qualified_key(&self.binding, &self.column)
    }

    /// Test a single value. NULL never matches.
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }

        if let Some(pattern) = &self.pattern {
            return pattern.is_match(&value.to_string());
        }

        match value.compare(&self.value) {
            Some(ordering) => compare_holds(self.op, ordering),
            None => false,
        }
    }

    /// Test the predicate's column in a qualified row
    pub fn matches_row(&self, row: &Row) -> bool {
        row.get(&self.key()).map_or(false, |v| self.matches(v))
    }
}

/// Does `ordering` (left compared to right) satisfy `op`?
pub fn compare_holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        // LIKE is only meaningful on text and is matched by pattern
        CompareOp::Like => false,
    }
}

/// Translate a LIKE pattern: `%` matches any run of characters, the rest is literal
pub fn like_pattern(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?is)^{}$", body))
        .map_err(|e| Error::ParseError(format!("invalid LIKE pattern '{}': {}", pattern, e)))
}

/// Key of `column` of the table bound as `binding` in a qualified row
pub fn qualified_key(binding: &str, column: &str) -> String {
    format!("{}.{}", binding, column)
}
