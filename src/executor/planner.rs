//! Query Planner for docrel
//!
//! This module decides how rows are fetched: which conditions can be answered
//! from the primary key or an index, and which algorithm each join uses. The
//! decisions are plain data so they can be inspected without executing.

use std::fmt;

use super::condition::Predicate;
use crate::catalog::{IndexDef, TableDef};
use crate::sql::ast::CompareOp;

/// One way of narrowing a table to candidate primary keys
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPath {
    /// `pk = value` on a single-column primary key
    PrimaryKeyLookup { key: String },
    /// `col = value` on a single-column index
    IndexLookup { index: IndexDef, key: String },
    /// Range or LIKE on a single-column index, or conditions covering every
    /// column of a composite index. `predicates` index into the planned slice.
    IndexScan {
        index: IndexDef,
        predicates: Vec<usize>,
    },
}

/// How to read one table for a set of conditions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccessPlan {
    /// Paths whose candidate key sets are intersected; empty means full scan
    pub paths: Vec<AccessPath>,
    /// Conditions still to test on the decoded candidate rows
    pub residual: Vec<usize>,
}

impl AccessPlan {
    /// True if the table must be scanned in full
    pub fn is_full_scan(&self) -> bool {
        self.paths.is_empty()
    }
}

/// How the joined table is probed by an indexed-nested-loop join
#[derive(Debug, Clone, PartialEq)]
pub enum JoinProbe {
    /// Fetch rows directly by primary key
    PrimaryKey,
    /// Look keys up in a single-column index
    Index(IndexDef),
}

/// Join algorithm chosen for one join
#[derive(Debug, Clone, PartialEq)]
pub enum JoinAlgorithm {
    /// Iterate the accumulated rows, probing the joined table per row
    IndexedNestedLoop(JoinProbe),
    /// Sort both sides on the join column and merge
    SortMerge,
    /// Compare every pair; used for comma-separated tables
    NestedLoop,
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinAlgorithm::IndexedNestedLoop(_) => write!(f, "indexed-nested-loop"),
            JoinAlgorithm::SortMerge => write!(f, "sort-merge"),
            JoinAlgorithm::NestedLoop => write!(f, "nested-loop"),
        }
    }
}

/// Query planner
pub struct Planner {
    use_indexes: bool,
}

impl Planner {
    /// Create a new planner
    pub fn new(use_indexes: bool) -> Self {
        Self { use_indexes }
    }

    /// Plan access to `table` for conditions that all name its columns
    pub fn plan_access(&self, table: &TableDef, predicates: &[Predicate]) -> AccessPlan {
        if !self.use_indexes {
            return AccessPlan {
                paths: Vec::new(),
                residual: (0..predicates.len()).collect(),
            };
        }

        let mut paths = Vec::new();
        let mut used = vec![false; predicates.len()];

        for (i, predicate) in predicates.iter().enumerate() {
            let column = &predicate.column;

            if predicate.op == CompareOp::Eq && table.is_primary_key(&[column.clone()]) {
                paths.push(AccessPath::PrimaryKeyLookup {
                    key: predicate.value.to_string(),
                });
                used[i] = true;
                continue;
            }

            let Some(index) = table.indexes.iter().find(|ix| ix.covers_single(column)) else {
                continue;
            };
            paths.push(if predicate.op == CompareOp::Eq {
                AccessPath::IndexLookup {
                    index: index.clone(),
                    key: predicate.value.to_string(),
                }
            } else {
                AccessPath::IndexScan {
                    index: index.clone(),
                    predicates: vec![i],
                }
            });
            used[i] = true;
        }

        // Composite indexes need a condition on every indexed column
        for index in table.indexes.iter().filter(|ix| ix.columns.len() > 1) {
            let covered = index
                .columns
                .iter()
                .all(|c| predicates.iter().any(|p| &p.column == c));
            if !covered {
                continue;
            }

            let on_index: Vec<usize> = predicates
                .iter()
                .enumerate()
                .filter(|(_, p)| index.columns.contains(&p.column))
                .map(|(i, _)| i)
                .collect();
            for &i in &on_index {
                used[i] = true;
            }
            paths.push(AccessPath::IndexScan {
                index: index.clone(),
                predicates: on_index,
            });
        }

        AccessPlan {
            paths,
            residual: (0..predicates.len()).filter(|&i| !used[i]).collect(),
        }
    }

    /// Choose the algorithm for a join on `left.left_column = right.right_column`,
    /// where `right` is the table being joined in.
    pub fn plan_join(
        &self,
        left: &TableDef,
        left_column: &str,
        right: &TableDef,
        right_column: &str,
    ) -> JoinAlgorithm {
        if !self.use_indexes || !left.is_indexed(left_column) || !right.is_indexed(right_column) {
            return JoinAlgorithm::SortMerge;
        }

        if right.is_primary_key(&[right_column.to_string()]) {
            return JoinAlgorithm::IndexedNestedLoop(JoinProbe::PrimaryKey);
        }
        match right.indexes.iter().find(|ix| ix.covers_single(right_column)) {
            Some(index) => JoinAlgorithm::IndexedNestedLoop(JoinProbe::Index(index.clone())),
            None => JoinAlgorithm::SortMerge,
        }
    }
}
