//! Typed values for docrel
//!
//! This module defines how column values are represented in memory, how they
//! are coerced from command literals, and how they are parsed back from their
//! stored text form.

use crate::catalog::{Column, DataType};
use crate::error::{Error, Result};
use crate::sql::ast::Literal;
use nom::bytes::complete::take_while_m_n;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map_res};
use nom::sequence::{preceded, tuple};
use nom::IResult;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Characters reserved by the row and index encodings
pub const RESERVED_CHARS: [char; 2] = ['$', '#'];

/// A value in the database
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value; only produced by outer joins and empty aggregates
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (64-bit)
    Integer(i64),
    /// Float value (64-bit)
    Float(f64),
    /// Date value, always `YYYY-MM-DD`
    Date(String),
    /// String value
    Text(String),
}

// Float compares bitwise so values can key hash maps
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Date(v) | Value::Text(v) => v.hash(state),
        }
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the value, as used by aggregates.
    /// Text that spells a number counts; dates and booleans do not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Compare two values (for WHERE clauses, joins, ORDER BY)
    ///
    /// Returns `None` when either side is NULL or the types are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,

            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),

            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Text(b)) | (Value::Text(a), Value::Date(b)) => {
                Some(a.cmp(b))
            }

            _ => None,
        }
    }

    /// Total order used when sorting join inputs: NULLs first, then by
    /// [`Value::compare`], falling back to the stored text for mixed types.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .compare(other)
                .unwrap_or_else(|| self.to_string().cmp(&other.to_string())),
        }
    }

    /// Parse the text form of a value of the given type
    pub fn parse(text: &str, data_type: &DataType) -> Option<Value> {
        match data_type {
            DataType::Int => text.trim().parse::<i64>().ok().map(Value::Integer),
            // -0.0 is stored as 0 so it shares a key with 0
            DataType::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| Value::Float(if f == 0.0 { 0.0 } else { f })),
            DataType::Bool => match text.trim().to_lowercase().as_str() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            DataType::Date => is_valid_date(text).then(|| Value::Date(text.to_string())),
            DataType::Varchar(_) | DataType::Char(_) => Some(Value::Text(text.to_string())),
        }
    }

    /// Parse a stored field, keeping the raw text if it no longer matches the type
    pub fn decode(text: &str, data_type: &DataType) -> Value {
        Value::parse(text, data_type).unwrap_or_else(|| Value::Text(text.to_string()))
    }

    /// String columns only accept single-quoted literals
    pub fn check_quoted(literal: &Literal, column: &Column) -> Result<()> {
        if column.data_type.is_string() && !literal.is_quoted() {
            return Err(Error::UnquotedString {
                column: column.name.clone(),
                data_type: column.data_type.name().to_string(),
            });
        }
        Ok(())
    }

    /// Coerce an insert literal to the column's type, enforcing quoting,
    /// length and reserved-character rules.
    pub fn from_literal(literal: &Literal, column: &Column) -> Result<Value> {
        let data_type = &column.data_type;
        Value::check_quoted(literal, column)?;

        let text = literal.text();
        if text.contains(RESERVED_CHARS) {
            return Err(Error::ReservedCharacter(column.name.clone()));
        }
        if let Some(length) = data_type.max_length() {
            if text.chars().count() > length {
                return Err(Error::ValueTooLong {
                    column: column.name.clone(),
                    length,
                });
            }
        }

        Value::parse(&text, data_type).ok_or_else(|| Error::TypeMismatch {
            column: column.name.clone(),
            data_type: data_type.to_string(),
            value: text,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

fn digits(input: &str, count: usize) -> IResult<&str, u32> {
    map_res(
        take_while_m_n(count, count, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u32>(),
    )(input)
}

fn year(input: &str) -> IResult<&str, u32> {
    digits(input, 4)
}

fn month_or_day(input: &str) -> IResult<&str, u32> {
    digits(input, 2)
}

fn date_parts(input: &str) -> IResult<&str, (u32, u32, u32)> {
    tuple((
        year,
        preceded(char('-'), month_or_day),
        preceded(char('-'), month_or_day),
    ))(input)
}

/// Check that `text` is a real calendar date in `YYYY-MM-DD` form
pub fn is_valid_date(text: &str) -> bool {
    let Ok((_, (year, month, day))) = all_consuming(date_parts)(text) else {
        return false;
    };
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days).contains(&day)
}
