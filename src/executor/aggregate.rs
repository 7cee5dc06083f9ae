//! Grouping and aggregation
//!
//! Rows are partitioned by the values of the grouped columns, in order of
//! first appearance. Each group is represented by its first row, extended with
//! one computed value per aggregate.

use indexmap::IndexMap;

use super::condition::compare_holds;
use crate::error::{Error, Result};
use crate::sql::ast::{AggregateFunc, CompareOp, Literal};
use crate::storage::{Row, Value};

/// An aggregate bound to a qualified argument column
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub func: AggregateFunc,
    /// Qualified argument key; `None` for `count(*)`
    pub arg: Option<String>,
}

impl AggregateSpec {
    pub fn new(func: AggregateFunc, arg: Option<String>) -> Self {
        Self { func, arg }
    }

    /// Key under which a group row carries this aggregate's value
    pub fn key(&self) -> String {
        match &self.arg {
            Some(arg) => format!("{}({})", self.func, arg),
            None => format!("{}(*)", self.func),
        }
    }

    /// Compute the aggregate over one group
    pub fn compute(&self, rows: &[Row]) -> Value {
        let Some(arg) = &self.arg else {
            return Value::Integer(rows.len() as i64);
        };

        let values: Vec<&Value> = rows
            .iter()
            .filter_map(|row| row.get(arg))
            .filter(|v| !v.is_null())
            .collect();

        if self.func == AggregateFunc::Count {
            return Value::Integer(values.len() as i64);
        }

        let numeric: Vec<(&Value, f64)> = values
            .into_iter()
            .filter_map(|v| v.as_f64().map(|n| (v, n)))
            .collect();
        if numeric.is_empty() {
            return Value::Null;
        }

        match self.func {
            AggregateFunc::Sum => sum(&numeric),
            AggregateFunc::Avg => {
                let total: f64 = numeric.iter().map(|(_, n)| n).sum();
                Value::Float(total / numeric.len() as f64)
            }
            AggregateFunc::Max => extreme(&numeric, |a, b| a > b),
            AggregateFunc::Min => extreme(&numeric, |a, b| a < b),
            AggregateFunc::Count => Value::Integer(numeric.len() as i64),
        }
    }
}

/// Integer sum while every input is an integer that fits, float sum otherwise
fn sum(numeric: &[(&Value, f64)]) -> Value {
    let exact = numeric.iter().try_fold(0i64, |acc, (value, _)| match value {
        Value::Integer(i) => acc.checked_add(*i),
        _ => None,
    });
    match exact {
        Some(total) => Value::Integer(total),
        None => Value::Float(numeric.iter().map(|(_, n)| n).sum()),
    }
}

fn extreme(numeric: &[(&Value, f64)], better: impl Fn(f64, f64) -> bool) -> Value {
    let mut best = numeric[0];
    for &candidate in &numeric[1..] {
        if better(candidate.1, best.1) {
            best = candidate;
        }
    }
    best.0.clone()
}

/// A compiled `having <aggregate> <op> <number>` test
#[derive(Debug, Clone)]
pub struct HavingFilter {
    pub aggregate: AggregateSpec,
    pub op: CompareOp,
    pub value: f64,
}

impl HavingFilter {
    pub fn compile(aggregate: AggregateSpec, op: CompareOp, literal: &Literal) -> Result<Self> {
        if op == CompareOp::Like {
            return Err(Error::ParseError(
                "LIKE cannot be applied to an aggregate".to_string(),
            ));
        }
        let text = literal.text();
        let value = text
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::TypeMismatch {
                column: aggregate.key(),
                data_type: "numeric".to_string(),
                value: text.clone(),
            })?;
        Ok(Self {
            aggregate,
            op,
            value,
        })
    }

    /// Test a group row produced by [`group_rows`]
    pub fn matches(&self, group: &Row) -> bool {
        group
            .get(&self.aggregate.key())
            .and_then(Value::as_f64)
            .and_then(|n| n.partial_cmp(&self.value))
            .map_or(false, |ordering| compare_holds(self.op, ordering))
    }
}

/// Partition `rows` by `group_keys` and compute `aggregates` per group.
///
/// Without group keys all rows form one group, which exists even when there
/// are no rows; its representative row is then all NULL.
pub fn group_rows(
    columns: &[String],
    rows: Vec<Row>,
    group_keys: &[String],
    aggregates: &[AggregateSpec],
) -> Vec<Row> {
    let mut groups: IndexMap<Vec<Value>, Vec<Row>> = IndexMap::new();
    if group_keys.is_empty() {
        groups.insert(Vec::new(), rows);
    } else {
        for row in rows {
            let key: Vec<Value> = group_keys
                .iter()
                .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
                .collect();
            groups.entry(key).or_default().push(row);
        }
    }

    groups
        .into_values()
        .map(|members| {
            let mut group = match members.first() {
                Some(first) => first.clone(),
                None => columns.iter().map(|c| (c.clone(), Value::Null)).collect(),
            };
            for spec in aggregates {
                group.insert(spec.key(), spec.compute(&members));
            }
            group
        })
        .collect()
}
