//! Join algorithms
//!
//! Rows taking part in a join are keyed by `binding.column`. Each algorithm
//! only finds the matching `(left, right)` row pairs; [`assemble`] then adds
//! the unmatched rows an outer join keeps, null-filling the missing side.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::sql::ast::JoinType;
use crate::storage::{Row, Value};

/// An intermediate result: qualified column names and rows keyed by them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relation {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Relation {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// A row with every column of this relation set to NULL
    fn null_row(&self) -> Row {
        self.columns
            .iter()
            .map(|c| (c.clone(), Value::Null))
            .collect()
    }
}

/// Equality used by every join algorithm: NULL matches nothing
pub fn join_values_equal(left: &Value, right: &Value) -> bool {
    !left.is_null() && !right.is_null() && left.sort_cmp(right) == Ordering::Equal
}

fn value_of<'r>(row: &'r Row, key: &str) -> &'r Value {
    row.get(key).unwrap_or(&Value::Null)
}

/// Do the two rows agree on every `(left key, right key)` equality?
pub fn rows_match(left: &Row, right: &Row, on: &[(String, String)]) -> bool {
    on.iter()
        .all(|(l, r)| join_values_equal(value_of(left, l), value_of(right, r)))
}

fn merge(left: &Row, right: &Row) -> Row {
    let mut row = left.clone();
    row.extend(right.iter().map(|(k, v)| (k.clone(), v.clone())));
    row
}

/// Build the join output from matched pairs.
///
/// Matched rows come first in pair order, then unmatched left rows (left and
/// full joins), then unmatched right rows (right and full joins).
pub fn assemble(
    left: &Relation,
    right: &Relation,
    join_type: JoinType,
    pairs: &[(usize, usize)],
) -> Relation {
    let mut columns = left.columns.clone();
    columns.extend(right.columns.iter().cloned());

    let mut rows: Vec<Row> = pairs
        .iter()
        .map(|&(l, r)| merge(&left.rows[l], &right.rows[r]))
        .collect();

    if matches!(join_type, JoinType::Left | JoinType::Full) {
        let matched: HashSet<usize> = pairs.iter().map(|&(l, _)| l).collect();
        let nulls = right.null_row();
        for (i, row) in left.rows.iter().enumerate() {
            if !matched.contains(&i) {
                rows.push(merge(row, &nulls));
            }
        }
    }

    if matches!(join_type, JoinType::Right | JoinType::Full) {
        let matched: HashSet<usize> = pairs.iter().map(|&(_, r)| r).collect();
        let nulls = left.null_row();
        for (i, row) in right.rows.iter().enumerate() {
            if !matched.contains(&i) {
                rows.push(merge(&nulls, row));
            }
        }
    }

    Relation::new(columns, rows)
}

/// Compare every pair of rows
pub fn nested_loop_pairs(left: &Relation, right: &Relation, on: &[(String, String)]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (l, left_row) in left.rows.iter().enumerate() {
        for (r, right_row) in right.rows.iter().enumerate() {
            if rows_match(left_row, right_row, on) {
                pairs.push((l, r));
            }
        }
    }
    pairs
}

/// Value families whose members compare with each other directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Numeric,
    Boolean,
    Text,
}

fn key_family(value: &Value) -> Option<KeyFamily> {
    match value {
        Value::Null => None,
        Value::Integer(_) | Value::Float(_) => Some(KeyFamily::Numeric),
        Value::Boolean(_) => Some(KeyFamily::Boolean),
        Value::Date(_) | Value::Text(_) => Some(KeyFamily::Text),
    }
}

/// The single family of every non-NULL `key` value, if there is one
fn relation_family(relation: &Relation, key: &str) -> Option<KeyFamily> {
    let mut families = relation
        .rows
        .iter()
        .filter_map(|row| key_family(value_of(row, key)));
    let first = families.next()?;
    families.all(|f| f == first).then_some(first)
}

/// Sort both sides on the first equality and merge them with two cursors.
/// Further equalities in `on` filter the pairs of each run of equal keys.
///
/// When the key columns hold different kinds of values both sides are
/// ordered by stored text, the same key an index probe uses.
pub fn sort_merge_pairs(left: &Relation, right: &Relation, on: &[(String, String)]) -> Vec<(usize, usize)> {
    let Some((left_key, right_key)) = on.first() else {
        return nested_loop_pairs(left, right, on);
    };
    let rest = &on[1..];

    let by_text = match (relation_family(left, left_key), relation_family(right, right_key)) {
        (Some(l), Some(r)) => l != r,
        _ => true,
    };
    let key_cmp = |a: &Value, b: &Value| -> Ordering {
        if by_text {
            a.to_string().cmp(&b.to_string())
        } else {
            a.sort_cmp(b)
        }
    };

    let sorted = |relation: &Relation, key: &str| -> Vec<usize> {
        let mut order: Vec<usize> = (0..relation.rows.len())
            .filter(|&i| !value_of(&relation.rows[i], key).is_null())
            .collect();
        order.sort_by(|&a, &b| key_cmp(value_of(&relation.rows[a], key), value_of(&relation.rows[b], key)));
        order
    };
    let left_order = sorted(left, left_key);
    let right_order = sorted(right, right_key);

    let left_value = |i: usize| value_of(&left.rows[left_order[i]], left_key);
    let right_value = |j: usize| value_of(&right.rows[right_order[j]], right_key);

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left_order.len() && j < right_order.len() {
        match key_cmp(left_value(i), right_value(j)) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let mut i_end = i;
                while i_end < left_order.len() && key_cmp(left_value(i_end), left_value(i)) == Ordering::Equal {
                    i_end += 1;
                }
                let mut j_end = j;
                while j_end < right_order.len() && key_cmp(right_value(j_end), right_value(j)) == Ordering::Equal {
                    j_end += 1;
                }

                for &l in &left_order[i..i_end] {
                    for &r in &right_order[j..j_end] {
                        if rows_match(&left.rows[l], &right.rows[r], rest) {
                            pairs.push((l, r));
                        }
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(binding: &str, columns: &[&str], rows: &[&[Value]]) -> Relation {
        let columns: Vec<String> = columns
            .iter()
            .map(|c| format!("{}.{}", binding, c))
            .collect();
        let rows = rows
            .iter()
            .map(|values| columns.iter().cloned().zip(values.iter().cloned()).collect())
            .collect();
        Relation::new(columns, rows)
    }

    fn students() -> Relation {
        relation(
            "s",
            &["id", "name"],
            &[
                &[Value::Integer(1), Value::from("Ann")],
                &[Value::Integer(2), Value::from("Bob")],
                &[Value::Integer(3), Value::from("Cid")],
            ],
        )
    }

    fn grades() -> Relation {
        relation(
            "g",
            &["sid", "mark"],
            &[
                &[Value::Integer(3), Value::Integer(9)],
                &[Value::Integer(1), Value::Integer(7)],
                &[Value::Integer(1), Value::Integer(8)],
                &[Value::Integer(4), Value::Integer(5)],
            ],
        )
    }

    fn on() -> Vec<(String, String)> {
        vec![("s.id".to_string(), "g.sid".to_string())]
    }

    fn sorted(mut pairs: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
        pairs.sort();
        pairs
    }

    #[test]
    fn test_sort_merge_matches_nested_loop() {
        let (s, g) = (students(), grades());
        let merged = sort_merge_pairs(&s, &g, &on());
        assert_eq!(sorted(merged), sorted(nested_loop_pairs(&s, &g, &on())));
        assert_eq!(sorted(sort_merge_pairs(&s, &g, &on())), vec![(0, 1), (0, 2), (2, 0)]);
    }

    #[test]
    fn test_duplicate_runs_on_both_sides() {
        let left = relation("a", &["k"], &[&[Value::Integer(1)], &[Value::Integer(1)]]);
        let right = relation("b", &["k"], &[&[Value::Integer(1)], &[Value::Integer(1)], &[Value::Null]]);
        let on = vec![("a.k".to_string(), "b.k".to_string())];
        assert_eq!(sort_merge_pairs(&left, &right, &on).len(), 4);
    }

    #[test]
    fn test_outer_joins_fill_nulls() {
        let (s, g) = (students(), grades());
        let pairs = sort_merge_pairs(&s, &g, &on());

        let inner = assemble(&s, &g, JoinType::Inner, &pairs);
        assert_eq!(inner.rows.len(), 3);
        assert_eq!(inner.columns, vec!["s.id", "s.name", "g.sid", "g.mark"]);

        let left = assemble(&s, &g, JoinType::Left, &pairs);
        assert_eq!(left.rows.len(), 4);
        assert_eq!(left.rows[3]["s.name"], Value::from("Bob"));
        assert_eq!(left.rows[3]["g.mark"], Value::Null);

        let right = assemble(&s, &g, JoinType::Right, &pairs);
        assert_eq!(right.rows.len(), 4);
        assert_eq!(right.rows[3]["s.id"], Value::Null);
        assert_eq!(right.rows[3]["g.sid"], Value::Integer(4));

        let full = assemble(&s, &g, JoinType::Full, &pairs);
        assert_eq!(full.rows.len(), 5);
    }

    #[test]
    fn test_extra_equalities_filter_pairs() {
        let (s, g) = (students(), grades());
        let mut on = on();
        on.push(("s.id".to_string(), "g.mark".to_string()));
        assert!(sort_merge_pairs(&s, &g, &on).is_empty());
    }

    #[test]
    fn test_int_against_text_keys() {
        let numbers = relation(
            "a",
            &["k"],
            &[&[Value::Integer(1)], &[Value::Integer(2)], &[Value::Integer(10)]],
        );
        let strings = relation(
            "b",
            &["s"],
            &[&[Value::from("1")], &[Value::from("2")], &[Value::from("10")]],
        );
        let on = vec![("a.k".to_string(), "b.s".to_string())];

        let merged = sorted(sort_merge_pairs(&numbers, &strings, &on));
        assert_eq!(merged, vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(merged, sorted(nested_loop_pairs(&numbers, &strings, &on)));
    }

    #[test]
    fn test_null_never_joins() {
        assert!(!join_values_equal(&Value::Null, &Value::Null));
        assert!(join_values_equal(&Value::Integer(2), &Value::Float(2.0)));
    }
}
