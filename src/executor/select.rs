//! SELECT execution
//!
//! Pipeline: resolve names, read each table through its access plan, join,
//! filter, group and aggregate, apply `having`, sort, project, and drop
//! duplicates. Intermediate rows are keyed by `binding.column`.

use indexmap::IndexSet;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use super::aggregate::{group_rows, AggregateSpec, HavingFilter};
use super::condition::{qualified_key, Predicate};
use super::engine::{ExecutionEngine, QueryResult, Session};
use super::index::{decode_index_key, IndexStore};
use super::join::{assemble, nested_loop_pairs, rows_match, sort_merge_pairs, Relation};
use super::planner::{AccessPath, JoinAlgorithm, JoinProbe, Planner};
use crate::catalog::{Column, TableDef};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::storage::{Row, RowCodec, Value};

/// A table as named in the query
struct Binding {
    name: String,
    table: Arc<TableDef>,
}

impl Binding {
    fn columns(&self) -> Vec<String> {
        self.table
            .columns
            .iter()
            .map(|c| qualified_key(&self.name, &c.name))
            .collect()
    }
}

/// A column reference resolved to its table binding
struct Resolved<'s> {
    binding: &'s Binding,
    column: &'s Column,
}

impl Resolved<'_> {
    fn key(&self) -> String {
        qualified_key(&self.binding.name, &self.column.name)
    }
}

/// Every table binding visible to a query, in `from` then `join` order
struct Scope {
    bindings: Vec<Binding>,
}

impl Scope {
    fn new(bindings: Vec<Binding>) -> Result<Self> {
        for (i, binding) in bindings.iter().enumerate() {
            if bindings[..i].iter().any(|b| b.name == binding.name) {
                return Err(Error::DuplicateAlias(binding.name.clone()));
            }
        }
        Ok(Self { bindings })
    }

    fn table_names(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for binding in &self.bindings {
            if !names.contains(&binding.table.name()) {
                names.push(binding.table.name());
            }
        }
        names.join(", ")
    }

    fn unknown(&self, column: &ColumnRef) -> Error {
        Error::UnknownColumns {
            tables: self.table_names(),
            columns: column.to_string(),
        }
    }

    fn resolve(&self, column: &ColumnRef) -> Result<Resolved<'_>> {
        if let Some(qualifier) = &column.qualifier {
            let binding = self
                .bindings
                .iter()
                .find(|b| &b.name == qualifier)
                .ok_or_else(|| Error::UnknownAlias(qualifier.clone()))?;
            let resolved = binding.table.get_column(&column.name).map(|c| Resolved {
                binding,
                column: c,
            });
            return resolved.ok_or_else(|| self.unknown(column));
        }

        let mut found = self.bindings.iter().filter_map(|binding| {
            binding
                .table
                .get_column(&column.name)
                .map(|c| Resolved { binding, column: c })
        });
        let first = found.next().ok_or_else(|| self.unknown(column))?;
        if found.next().is_some() {
            return Err(Error::AmbiguousColumn(column.name.clone()));
        }
        Ok(first)
    }

    /// Resolve every reference up front, reporting all unknown columns at once
    fn check<'a>(&self, columns: impl IntoIterator<Item = &'a ColumnRef>) -> Result<()> {
        let mut unknown = Vec::new();
        for column in columns {
            match self.resolve(column) {
                Ok(_) => {}
                Err(Error::UnknownColumns { .. }) => {
                    let name = column.to_string();
                    if !unknown.contains(&name) {
                        unknown.push(name);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if !unknown.is_empty() {
            return Err(Error::UnknownColumns {
                tables: self.table_names(),
                columns: unknown.join(", "),
            });
        }
        Ok(())
    }
}

/// Every column reference a statement makes
fn column_refs(stmt: &SelectStatement) -> Vec<&ColumnRef> {
    let mut refs = Vec::new();
    for item in &stmt.items {
        match item {
            SelectItem::Column(c) => refs.push(c),
            SelectItem::Aggregate(agg) => refs.extend(agg.arg.as_ref()),
            SelectItem::Wildcard => {}
        }
    }
    for join in &stmt.joins {
        for (left, right) in &join.on {
            refs.push(left);
            refs.push(right);
        }
    }
    refs.extend(stmt.where_clause.iter().map(|c| &c.column));
    refs.extend(stmt.group_by.iter());
    refs.extend(stmt.having.iter().filter_map(|h| h.aggregate.arg.as_ref()));
    refs.extend(stmt.order_by.iter().map(|o| &o.column));
    refs
}

impl ExecutionEngine {
    pub(crate) async fn execute_select(
        &self,
        session: &Session,
        stmt: SelectStatement,
    ) -> Result<QueryResult> {
        let db = session.require_database()?;

        let mut bindings = Vec::new();
        for table_ref in stmt.from.iter().chain(stmt.joins.iter().map(|j| &j.table)) {
            bindings.push(Binding {
                name: table_ref.binding().to_string(),
                table: self.catalog.find_table(db, &table_ref.name)?,
            });
        }
        let scope = Scope::new(bindings)?;
        scope.check(column_refs(&stmt))?;

        let single_table = stmt.from.len() == 1 && stmt.joins.is_empty();

        let mut predicates = Vec::with_capacity(stmt.where_clause.len());
        for condition in &stmt.where_clause {
            let resolved = scope.resolve(&condition.column)?;
            predicates.push(Predicate::compile(
                resolved.binding.name.clone(),
                resolved.column.name.clone(),
                &resolved.column.data_type,
                condition.op,
                &condition.value,
            )?);
        }

        let relation = self.read_relation(db, &scope, &stmt, &predicates).await?;
        let mut rows = relation.rows;
        if !single_table {
            rows.retain(|row| predicates.iter().all(|p| p.matches_row(row)));
        }

        if stmt.is_grouped() {
            rows = self.group(&scope, &stmt, &relation.columns, rows)?;
        }

        if !stmt.order_by.is_empty() {
            let mut keys = Vec::with_capacity(stmt.order_by.len());
            for item in &stmt.order_by {
                keys.push((scope.resolve(&item.column)?.key(), item.descending));
            }
            rows = sort_rows(rows, &keys);
        }

        // Output column names and the row keys they are read from
        let mut projection: Vec<(String, String)> = Vec::new();
        for item in &stmt.items {
            match item {
                SelectItem::Wildcard => {
                    for binding in &scope.bindings {
                        for column in &binding.table.columns {
                            let key = qualified_key(&binding.name, &column.name);
                            let name = if single_table { column.name.clone() } else { key.clone() };
                            projection.push((name, key));
                        }
                    }
                }
                SelectItem::Column(column) => {
                    let resolved = scope.resolve(column)?;
                    let name = if single_table {
                        resolved.column.name.clone()
                    } else {
                        resolved.key()
                    };
                    projection.push((name, resolved.key()));
                }
                SelectItem::Aggregate(aggregate) => {
                    let spec = aggregate_spec(&scope, aggregate)?;
                    projection.push((aggregate.to_string(), spec.key()));
                }
            }
        }

        let mut output: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|(_, key)| row.get(key).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        if stmt.distinct {
            let unique: IndexSet<Vec<Value>> = output.into_iter().collect();
            output = unique.into_iter().collect();
        }

        let columns = projection.into_iter().map(|(name, _)| name).collect();
        Ok(QueryResult::with_rows(columns, output))
    }

    /// Read every `from` table, cross join them, then apply the joins in order
    async fn read_relation(
        &self,
        db: &str,
        scope: &Scope,
        stmt: &SelectStatement,
        predicates: &[Predicate],
    ) -> Result<Relation> {
        // Conditions may narrow a table before joining only if no join can
        // bring back rows of that table as null-filled
        let prefilter = stmt
            .joins
            .iter()
            .all(|j| matches!(j.join_type, JoinType::Inner | JoinType::Left));

        let (from, joined) = scope.bindings.split_at(stmt.from.len());

        let mut relation: Option<Relation> = None;
        for binding in from {
            let own: Vec<Predicate> = if prefilter {
                predicates
                    .iter()
                    .filter(|p| p.binding == binding.name)
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            let right = self.read_table(db, binding, &own).await?;
            relation = Some(match relation {
                None => right,
                Some(left) => {
                    let pairs = nested_loop_pairs(&left, &right, &[]);
                    assemble(&left, &right, JoinType::Inner, &pairs)
                }
            });
        }
        let mut relation =
            relation.ok_or_else(|| Error::Internal("select without tables".to_string()))?;

        for (join, binding) in stmt.joins.iter().zip(joined) {
            relation = self.join(db, scope, relation, join, binding).await?;
        }
        Ok(relation)
    }

    async fn join(
        &self,
        db: &str,
        scope: &Scope,
        left: Relation,
        join: &Join,
        binding: &Binding,
    ) -> Result<Relation> {
        let mut on = Vec::with_capacity(join.on.len());
        let mut first: Option<(Arc<TableDef>, String, String)> = None;

        for (a, b) in &join.on {
            let (ra, rb) = (scope.resolve(a)?, scope.resolve(b)?);
            let (l, r) = if rb.binding.name == binding.name {
                (ra, rb)
            } else {
                (rb, ra)
            };
            if r.binding.name != binding.name || !left.columns.contains(&l.key()) {
                return Err(Error::InvalidJoinCondition(format!("{} = {}", a, b)));
            }

            if first.is_none() {
                first = Some((
                    l.binding.table.clone(),
                    l.column.name.clone(),
                    r.column.name.clone(),
                ));
            }
            on.push((l.key(), r.key()));
        }

        let (left_table, left_column, right_column) = first
            .ok_or_else(|| Error::InvalidJoinCondition(join.table.binding().to_string()))?;
        let algorithm = Planner::new(self.use_indexes).plan_join(
            &left_table,
            &left_column,
            &binding.table,
            &right_column,
        );
        debug!(
            join_type = %join.join_type,
            table = %binding.table.name,
            algorithm = %algorithm,
            "join planned"
        );

        let (right, pairs) = match &algorithm {
            JoinAlgorithm::IndexedNestedLoop(probe) => {
                self.indexed_nested_loop(db, &left, binding, probe, &on, join.join_type)
                    .await?
            }
            JoinAlgorithm::SortMerge => {
                let right = self.read_table(db, binding, &[]).await?;
                let pairs = sort_merge_pairs(&left, &right, &on);
                (right, pairs)
            }
            JoinAlgorithm::NestedLoop => {
                let right = self.read_table(db, binding, &[]).await?;
                let pairs = nested_loop_pairs(&left, &right, &on);
                (right, pairs)
            }
        };

        Ok(assemble(&left, &right, join.join_type, &pairs))
    }

    /// Probe the joined table once per accumulated row. Only probed rows are
    /// read, unless the join keeps unmatched rows of the joined table.
    async fn indexed_nested_loop(
        &self,
        db: &str,
        left: &Relation,
        binding: &Binding,
        probe: &JoinProbe,
        on: &[(String, String)],
        join_type: JoinType,
    ) -> Result<(Relation, Vec<(usize, usize)>)> {
        let table = &binding.table;
        let indexes = IndexStore::new(self.store.as_ref(), db);
        let mut right = Relation::new(binding.columns(), Vec::new());
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut pairs = Vec::new();

        let left_key = on.first().map(|(l, _)| l.as_str()).unwrap_or_default();
        for (l, row) in left.rows.iter().enumerate() {
            let Some(value) = row.get(left_key).filter(|v| !v.is_null()) else {
                continue;
            };
            let probe_key = value.to_string();
            let keys = match probe {
                JoinProbe::PrimaryKey => vec![probe_key],
                JoinProbe::Index(index) => indexes.lookup(index, &probe_key).await?,
            };

            for pk in keys {
                let position = match positions.get(&pk) {
                    Some(&p) => p,
                    None => {
                        let Some(doc) = self.store.find_by_id(db, &table.collection, &pk).await?
                        else {
                            continue;
                        };
                        let decoded = RowCodec::decode(table, &doc.id, &doc.value)?;
                        right.rows.push(qualify(&binding.name, decoded));
                        positions.insert(pk, right.rows.len() - 1);
                        right.rows.len() - 1
                    }
                };
                if rows_match(row, &right.rows[position], on) {
                    pairs.push((l, position));
                }
            }
        }

        if matches!(join_type, JoinType::Right | JoinType::Full) {
            for (pk, row) in self.read_rows(db, binding, &[]).await? {
                if !positions.contains_key(&pk) {
                    right.rows.push(row);
                }
            }
        }

        Ok((right, pairs))
    }

    async fn read_table(
        &self,
        db: &str,
        binding: &Binding,
        predicates: &[Predicate],
    ) -> Result<Relation> {
        let rows = self
            .read_rows(db, binding, predicates)
            .await?
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        Ok(Relation::new(binding.columns(), rows))
    }

    /// Rows of one table satisfying `predicates`, with their primary keys,
    /// ordered by primary key
    async fn read_rows(
        &self,
        db: &str,
        binding: &Binding,
        predicates: &[Predicate],
    ) -> Result<Vec<(String, Row)>> {
        let table = &binding.table;
        let plan = Planner::new(self.use_indexes).plan_access(table, predicates);
        debug!(
            table = %table.name,
            paths = plan.paths.len(),
            residual = plan.residual.len(),
            full_scan = plan.is_full_scan(),
            "access planned"
        );

        let documents = if plan.is_full_scan() {
            self.store.find_all(db, &table.collection).await?
        } else {
            let mut candidates: Option<BTreeSet<String>> = None;
            for path in &plan.paths {
                let keys = self.path_keys(db, table, path, predicates).await?;
                let narrowed = match candidates {
                    None => keys,
                    Some(current) => current.intersection(&keys).cloned().collect(),
                };
                let exhausted = narrowed.is_empty();
                candidates = Some(narrowed);
                if exhausted {
                    break;
                }
            }

            let mut documents = Vec::new();
            for pk in candidates.unwrap_or_default() {
                if let Some(doc) = self.store.find_by_id(db, &table.collection, &pk).await? {
                    documents.push(doc);
                }
            }
            documents
        };

        let mut rows = Vec::with_capacity(documents.len());
        for doc in documents {
            let row = qualify(
                &binding.name,
                RowCodec::decode(table, &doc.id, &doc.value)?,
            );
            if plan.residual.iter().all(|&i| predicates[i].matches_row(&row)) {
                rows.push((doc.id, row));
            }
        }
        Ok(rows)
    }

    /// Primary keys an access path yields
    async fn path_keys(
        &self,
        db: &str,
        table: &TableDef,
        path: &AccessPath,
        predicates: &[Predicate],
    ) -> Result<BTreeSet<String>> {
        let indexes = IndexStore::new(self.store.as_ref(), db);
        match path {
            AccessPath::PrimaryKeyLookup { key } => Ok(BTreeSet::from([key.clone()])),
            AccessPath::IndexLookup { index, key } => {
                Ok(indexes.lookup(index, key).await?.into_iter().collect())
            }
            AccessPath::IndexScan {
                index,
                predicates: used,
            } => {
                let mut keys = BTreeSet::new();
                for (entry, pks) in indexes.entries(index).await? {
                    let values = decode_index_key(table, index, &entry);
                    let accepted = used.iter().all(|&i| {
                        let predicate = &predicates[i];
                        index
                            .columns
                            .iter()
                            .position(|c| c == &predicate.column)
                            .and_then(|pos| values.get(pos))
                            .map_or(false, |v| predicate.matches(v))
                    });
                    if accepted {
                        keys.extend(pks);
                    }
                }
                Ok(keys)
            }
        }
    }

    fn group(
        &self,
        scope: &Scope,
        stmt: &SelectStatement,
        columns: &[String],
        rows: Vec<Row>,
    ) -> Result<Vec<Row>> {
        let mut group_keys = Vec::with_capacity(stmt.group_by.len());
        for column in &stmt.group_by {
            group_keys.push(scope.resolve(column)?.key());
        }

        let mut specs: Vec<AggregateSpec> = Vec::new();
        for aggregate in stmt.aggregates().chain(stmt.having.iter().map(|h| &h.aggregate)) {
            let spec = aggregate_spec(scope, aggregate)?;
            if !specs.contains(&spec) {
                specs.push(spec);
            }
        }

        let mut having = Vec::with_capacity(stmt.having.len());
        for condition in &stmt.having {
            having.push(HavingFilter::compile(
                aggregate_spec(scope, &condition.aggregate)?,
                condition.op,
                &condition.value,
            )?);
        }

        let mut groups = group_rows(columns, rows, &group_keys, &specs);
        groups.retain(|group| having.iter().all(|h| h.matches(group)));
        Ok(groups)
    }
}

fn aggregate_spec(scope: &Scope, aggregate: &Aggregate) -> Result<AggregateSpec> {
    let arg = match &aggregate.arg {
        Some(column) => Some(scope.resolve(column)?.key()),
        None => None,
    };
    Ok(AggregateSpec::new(aggregate.func, arg))
}

fn qualify(binding: &str, row: Row) -> Row {
    row.into_iter()
        .map(|(column, value)| (qualified_key(binding, &column), value))
        .collect()
}

/// Order two rows by `keys`; a key where either side is NULL does not decide
fn compare_rows(a: &Row, b: &Row, keys: &[(String, bool)]) -> Ordering {
    for (key, descending) in keys {
        let (Some(x), Some(y)) = (a.get(key), b.get(key)) else {
            continue;
        };
        match x.compare(y) {
            Some(Ordering::Equal) | None => continue,
            Some(ordering) if *descending => return ordering.reverse(),
            Some(ordering) => return ordering,
        }
    }
    Ordering::Equal
}

/// Stable merge sort. NULL-skipping comparisons are not a total order, which
/// the standard sort may reject.
fn sort_rows(rows: Vec<Row>, keys: &[(String, bool)]) -> Vec<Row> {
    if rows.len() <= 1 {
        return rows;
    }

    let mut left = rows;
    let right = left.split_off(left.len() / 2);
    let left = sort_rows(left, keys);
    let right = sort_rows(right, keys);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare_rows(l, r, keys) == Ordering::Greater,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::MemoryStore;

    async fn school(use_indexes: bool) -> (ExecutionEngine, Session) {
        let engine = ExecutionEngine::new(Arc::new(Catalog::in_memory()), Arc::new(MemoryStore::new()))
            .use_indexes(use_indexes);
        let mut session = Session::new();
        for command in [
            "create database School",
            "use School",
            "create table Students id int primary, name varchar 20, year int",
            "create table Grades gid int primary, sid int foreign=Students.id, course varchar 10, mark float",
            "create index by_year on Students year",
            "insert into Students id=1, name='Ann', year=2",
            "insert into Students id=2, name='Bob', year=1",
            "insert into Students id=3, name='Cid', year=2",
            "insert into Students id=4, name='Dee', year=3",
            "insert into Grades gid=10, sid=1, course='db', mark=9",
            "insert into Grades gid=11, sid=1, course='os', mark=7",
            "insert into Grades gid=12, sid=3, course='db', mark=6",
            "insert into Grades gid=13, sid=2, course='db', mark=4.5",
        ] {
            engine.execute(&mut session, command).await.unwrap();
        }
        (engine, session)
    }

    async fn query(engine: &ExecutionEngine, session: &mut Session, command: &str) -> QueryResult {
        engine.execute(session, command).await.unwrap()
    }

    fn ints(result: &QueryResult, column: usize) -> Vec<i64> {
        result
            .rows
            .iter()
            .map(|row| match &row[column] {
                Value::Integer(i) => *i,
                other => panic!("expected integer, got {:?}", other),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_select_by_primary_key() {
        let (engine, mut session) = school(true).await;
        let result = query(&engine, &mut session, "select * from Students where id = 1").await;
        assert_eq!(result.columns, vec!["id", "name", "year"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Integer(1), Value::from("Ann"), Value::Integer(2)]]
        );
    }

    #[tokio::test]
    async fn test_index_and_residual_conditions() {
        let (engine, mut session) = school(true).await;
        let result = query(
            &engine,
            &mut session,
            "select id from Students where year = 2 and name like 'c%'",
        )
        .await;
        assert_eq!(ints(&result, 0), vec![3]);

        let result = query(&engine, &mut session, "select id from Students where year >= 2").await;
        assert_eq!(ints(&result, 0), vec![1, 3, 4]);

        let result = query(&engine, &mut session, "select id from Students where year = 9").await;
        assert!(result.is_empty());
        assert_eq!(result.message.as_deref(), Some(QueryResult::NO_RESULTS));
    }

    #[tokio::test]
    async fn test_unknown_and_ambiguous_columns() {
        let (engine, mut session) = school(true).await;

        let err = engine
            .execute(&mut session, "select nope, other from Students")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following columns do not exist in table(s) Students: nope, other"
        );

        let err = engine
            .execute(&mut session, "select * from Students a join Students b on a.id = b.id where name = 'Ann'")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousColumn(ref c) if c == "name"));

        let err = engine
            .execute(&mut session, "select x.id from Students s")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAlias(_)));

        let err = engine
            .execute(&mut session, "select * from Students join Students on Students.id = Students.id")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateAlias(_)));
    }

    #[tokio::test]
    async fn test_joins() {
        for use_indexes in [true, false] {
            let (engine, mut session) = school(use_indexes).await;

            let inner = query(
                &engine,
                &mut session,
                "select s.name, g.course from Students s join Grades g on s.id = g.sid order by s.name, g.course",
            )
            .await;
            assert_eq!(inner.columns, vec!["s.name", "g.course"]);
            assert_eq!(inner.rows.len(), 4);
            assert_eq!(inner.rows[0], vec![Value::from("Ann"), Value::from("db")]);

            let left = query(
                &engine,
                &mut session,
                "select s.id, g.gid from Students s left join Grades g on s.id = g.sid where s.year > 1",
            )
            .await;
            assert_eq!(left.rows.len(), 4);
            assert!(left
                .rows
                .contains(&vec![Value::Integer(4), Value::Null]));

            let right = query(
                &engine,
                &mut session,
                "select g.gid, s.name from Grades g right join Students s on g.sid = s.id",
            )
            .await;
            assert_eq!(right.rows.len(), 5);
            assert!(right.rows.contains(&vec![Value::Null, Value::from("Dee")]));
        }
    }

    #[tokio::test]
    async fn test_comma_tables_cross_join() {
        let (engine, mut session) = school(true).await;
        let result = query(
            &engine,
            &mut session,
            "select s.id, g.gid from Students s, Grades g where s.id = 1 and g.mark > 6",
        )
        .await;
        assert_eq!(result.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_group_by_having() {
        let (engine, mut session) = school(true).await;
        let result = query(
            &engine,
            &mut session,
            "select course, count(*), avg(mark), max(mark) from Grades group by course having count(*) > 1",
        )
        .await;
        assert_eq!(result.columns, vec!["course", "count(*)", "avg(mark)", "max(mark)"]);
        assert_eq!(
            result.rows,
            vec![vec![
                Value::from("db"),
                Value::Integer(3),
                Value::Float(6.5),
                Value::Float(9.0)
            ]]
        );

        let total = query(&engine, &mut session, "select count(*), sum(year) from Students").await;
        assert_eq!(total.rows, vec![vec![Value::Integer(4), Value::Integer(8)]]);
    }

    #[tokio::test]
    async fn test_order_by_and_distinct() {
        let (engine, mut session) = school(true).await;
        let result = query(
            &engine,
            &mut session,
            "select year, id from Students order by year desc, id",
        )
        .await;
        assert_eq!(ints(&result, 1), vec![4, 1, 3, 2]);

        let result = query(&engine, &mut session, "select distinct year from Students order by year").await;
        assert_eq!(ints(&result, 0), vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_skips_null_keys() {
        let row = |a: Value, b: i64| -> Row {
            let mut row = Row::new();
            row.insert("a".to_string(), a);
            row.insert("b".to_string(), Value::Integer(b));
            row
        };
        let rows = vec![
            row(Value::Integer(2), 1),
            row(Value::Null, 0),
            row(Value::Integer(1), 2),
        ];
        let keys = vec![("a".to_string(), false), ("b".to_string(), false)];
        let sorted = sort_rows(rows, &keys);
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0]["b"], Value::Integer(0));
    }
}
