//! Column data types for docrel
//!
//! This module defines the scalar types a column may declare.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer
    Int,
    /// Double-precision floating point
    Float,
    /// Boolean (`true` / `false`)
    Bool,
    /// Calendar date written as `YYYY-MM-DD`
    Date,
    /// Variable-length character string with max length
    Varchar(usize),
    /// Fixed-length character string
    Char(usize),
}

impl DataType {
    /// Build a type from the name and optional length given in a column definition.
    ///
    /// `varchar` and `char` require a positive length; every other type rejects one.
    pub fn from_parts(column: &str, type_name: &str, length: Option<i64>) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidType {
            column: column.to_string(),
            reason,
        };

        let sized = |make: fn(usize) -> DataType| match length {
            Some(n) if n > 0 => Ok(make(n as usize)),
            Some(n) => Err(invalid(format!(
                "{} length must be a positive integer, got {}",
                type_name, n
            ))),
            None => Err(invalid(format!("{} requires a length", type_name))),
        };

        let unsized_type = |data_type: DataType| match length {
            None => Ok(data_type),
            Some(_) => Err(invalid(format!("{} does not take a length", type_name))),
        };

        match type_name.to_lowercase().as_str() {
            "int" => unsized_type(DataType::Int),
            "float" => unsized_type(DataType::Float),
            "bool" => unsized_type(DataType::Bool),
            "date" => unsized_type(DataType::Date),
            "varchar" => sized(DataType::Varchar),
            "char" => sized(DataType::Char),
            other => Err(invalid(format!("unknown type '{}'", other))),
        }
    }

    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// Check if this type is a character string type.
    /// Literals for these columns must be single-quoted.
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Varchar(_) | DataType::Char(_))
    }

    /// Declared maximum length for string types
    pub fn max_length(&self) -> Option<usize> {
        match self {
            DataType::Varchar(n) | DataType::Char(n) => Some(*n),
            _ => None,
        }
    }

    /// Type name without the length, as used in messages
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Bool => "BOOL",
            DataType::Date => "DATE",
            DataType::Varchar(_) => "VARCHAR",
            DataType::Char(_) => "CHAR",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Varchar(n) | DataType::Char(n) => write!(f, "{}({})", self.name(), n),
            _ => write!(f, "{}", self.name()),
        }
    }
}
