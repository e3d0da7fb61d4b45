//! In-memory storage adapter used by the integration tests.
//!
//! Implements the full `StorageAdapter` contract over JSON rows held in a
//! mutex-guarded table map. Transactions operate on a snapshot that
//! replaces the shared state on commit and is discarded on rollback. Raw
//! query and aggregate calls are recorded so tests can assert the SQL and
//! options the DAO hands to the adapter; failures can be injected per
//! table to exercise the tolerant error paths.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use entix_orm::{
    AggregateOptions, ConditionValue, Conditions, IsolationLevel, JoinClause, JoinType, OrmError,
    OrmResult, QueryOptions, Row, SqlDialect, StorageAdapter, TransactionScope,
};

#[derive(Debug, Clone, Default)]
struct TableData {
    rows: Vec<Row>,
    /// Physical identifier column; empty for tables without one (junction
    /// tables)
    id_column: String,
    next_id: i64,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: HashMap<String, TableData>,
}

/// Everything the adapter was asked to do that tests may assert on
#[derive(Debug, Default)]
pub struct AdapterLog {
    pub queries: Vec<(String, Vec<Value>)>,
    pub aggregates: Vec<(String, AggregateOptions)>,
    pub isolation_levels: Vec<Option<IsolationLevel>>,
}

#[derive(Clone)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
    log: Arc<Mutex<AdapterLog>>,
    fail_tables: Arc<Mutex<HashSet<String>>>,
    fail_raw: Arc<Mutex<bool>>,
    query_result: Arc<Mutex<Vec<Row>>>,
    dialect: SqlDialect,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::with_dialect(SqlDialect::SQLite)
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            log: Arc::new(Mutex::new(AdapterLog::default())),
            fail_tables: Arc::new(Mutex::new(HashSet::new())),
            fail_raw: Arc::new(Mutex::new(false)),
            query_result: Arc::new(Mutex::new(Vec::new())),
            dialect,
        }
    }

    /// Register a table. Pass an empty `id_column` for tables without a
    /// generated identifier.
    pub fn with_table(self, name: &str, id_column: &str) -> Self {
        self.state.lock().unwrap().tables.insert(
            name.to_string(),
            TableData {
                rows: Vec::new(),
                id_column: id_column.to_string(),
                next_id: 1,
            },
        );
        self
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Seed a row directly, bypassing the DAO pipeline
    pub fn seed(&self, table: &str, row: Row) {
        let mut state = self.state.lock().unwrap();
        let table = state.tables.get_mut(table).expect("table not registered");
        table.rows.push(row);
    }

    /// Make every operation on `table` fail with a storage error
    pub fn fail_table(&self, table: &str) {
        self.fail_tables.lock().unwrap().insert(table.to_string());
    }

    /// Make raw query/execute calls fail with a storage error
    pub fn fail_raw_queries(&self) {
        *self.fail_raw.lock().unwrap() = true;
    }

    /// Canned result for subsequent raw query calls
    pub fn set_query_result(&self, rows: Vec<Row>) {
        *self.query_result.lock().unwrap() = rows;
    }

    pub fn recorded_queries(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().queries.clone()
    }

    pub fn recorded_aggregates(&self) -> Vec<(String, AggregateOptions)> {
        self.log.lock().unwrap().aggregates.clone()
    }

    pub fn recorded_isolation_levels(&self) -> Vec<Option<IsolationLevel>> {
        self.log.lock().unwrap().isolation_levels.clone()
    }

    fn check_fail(&self, table: &str) -> OrmResult<()> {
        if self.fail_tables.lock().unwrap().contains(table) {
            Err(OrmError::Storage(format!("injected failure on '{}'", table)))
        } else {
            Ok(())
        }
    }

    fn with_table_data<R>(
        &self,
        table: &str,
        f: impl FnOnce(&mut TableData) -> R,
    ) -> OrmResult<R> {
        let mut state = self.state.lock().unwrap();
        let data = state
            .tables
            .get_mut(table)
            .ok_or_else(|| OrmError::Storage(format!("no such table '{}'", table)))?;
        Ok(f(data))
    }
}

fn value_matches(row_value: Option<&Value>, condition: &ConditionValue) -> bool {
    match condition {
        ConditionValue::Eq(expected) => row_value == Some(expected),
        ConditionValue::In(values) => row_value.map_or(false, |v| values.contains(v)),
        ConditionValue::Expr(_) => false,
    }
}

fn matches_row(row: &Row, conditions: &Conditions) -> bool {
    conditions
        .iter()
        .all(|(column, condition)| value_matches(row.get(column), condition))
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn apply_options(mut rows: Vec<Row>, options: &QueryOptions) -> Vec<Row> {
    for (column, direction) in options.order_by.iter().rev() {
        rows.sort_by(|a, b| {
            let ordering = cmp_values(
                a.get(column).unwrap_or(&Value::Null),
                b.get(column).unwrap_or(&Value::Null),
            );
            match direction {
                entix_orm::OrderDirection::Asc => ordering,
                entix_orm::OrderDirection::Desc => ordering.reverse(),
            }
        });
    }
    if let Some(offset) = options.offset {
        rows = rows.into_iter().skip(offset as usize).collect();
    }
    if let Some(limit) = options.limit {
        rows.truncate(limit as usize);
    }
    if !options.select.is_empty() {
        rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter(|(key, _)| options.select.contains(key))
                    .collect()
            })
            .collect();
    }
    rows
}

/// Resolve a possibly-qualified column reference against the rows in
/// scope: `"alias.column"` against the named row, a bare column against
/// the base row.
fn lookup<'a>(
    scope: &'a HashMap<String, Row>,
    base: &str,
    reference: &str,
) -> Option<&'a Value> {
    match reference.split_once('.') {
        Some((name, column)) => scope.get(name).and_then(|row| row.get(column)),
        None => scope.get(base).and_then(|row| row.get(reference)),
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn find_all(&self, table: &str, options: &QueryOptions) -> OrmResult<Vec<Row>> {
        self.find_by(table, &Conditions::new(), options).await
    }

    async fn find_by(
        &self,
        table: &str,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> OrmResult<Vec<Row>> {
        self.check_fail(table)?;
        let rows = self.with_table_data(table, |data| {
            data.rows
                .iter()
                .filter(|row| matches_row(row, conditions))
                .cloned()
                .collect::<Vec<_>>()
        })?;
        Ok(apply_options(rows, options))
    }

    async fn find_one_by(
        &self,
        table: &str,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> OrmResult<Option<Row>> {
        Ok(self.find_by(table, conditions, options).await?.into_iter().next())
    }

    async fn find_by_id(
        &self,
        table: &str,
        id_column: &str,
        id: &Value,
    ) -> OrmResult<Option<Row>> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            data.rows
                .iter()
                .find(|row| row.get(id_column) == Some(id))
                .cloned()
        })
    }

    async fn count(&self, table: &str, conditions: &Conditions) -> OrmResult<u64> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            data.rows.iter().filter(|row| matches_row(row, conditions)).count() as u64
        })
    }

    async fn exists(&self, table: &str, id_column: &str, id: &Value) -> OrmResult<bool> {
        Ok(self.find_by_id(table, id_column, id).await?.is_some())
    }

    async fn insert(&self, table: &str, mut row: Row) -> OrmResult<Value> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            let id = if data.id_column.is_empty() {
                Value::Null
            } else {
                match row.get(&data.id_column) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => {
                        let id = Value::from(data.next_id);
                        data.next_id += 1;
                        row.insert(data.id_column.clone(), id.clone());
                        id
                    }
                }
            };
            data.rows.push(row);
            id
        })
    }

    async fn bulk_insert(&self, table: &str, rows: Vec<Row>) -> OrmResult<u64> {
        self.check_fail(table)?;
        let count = rows.len() as u64;
        for row in rows {
            self.insert(table, row).await?;
        }
        Ok(count)
    }

    async fn update(
        &self,
        table: &str,
        id_column: &str,
        id: &Value,
        changes: Row,
    ) -> OrmResult<u64> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            let mut affected = 0;
            for row in data.rows.iter_mut() {
                if row.get(id_column) == Some(id) {
                    for (key, value) in changes.clone() {
                        row.insert(key, value);
                    }
                    affected += 1;
                }
            }
            affected
        })
    }

    async fn update_by(
        &self,
        table: &str,
        conditions: &Conditions,
        changes: Row,
    ) -> OrmResult<u64> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            let mut affected = 0;
            for row in data.rows.iter_mut() {
                if matches_row(row, conditions) {
                    for (key, value) in changes.clone() {
                        row.insert(key, value);
                    }
                    affected += 1;
                }
            }
            affected
        })
    }

    async fn delete(&self, table: &str, id_column: &str, id: &Value) -> OrmResult<u64> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            let before = data.rows.len();
            data.rows.retain(|row| row.get(id_column) != Some(id));
            (before - data.rows.len()) as u64
        })
    }

    async fn delete_by(&self, table: &str, conditions: &Conditions) -> OrmResult<u64> {
        self.check_fail(table)?;
        self.with_table_data(table, |data| {
            let before = data.rows.len();
            data.rows.retain(|row| !matches_row(row, conditions));
            (before - data.rows.len()) as u64
        })
    }

    async fn find_with_join(
        &self,
        table: &str,
        joins: &[JoinClause],
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> OrmResult<Vec<Row>> {
        self.check_fail(table)?;
        let state = self.state.lock().unwrap();
        let base_rows = state
            .tables
            .get(table)
            .ok_or_else(|| OrmError::Storage(format!("no such table '{}'", table)))?
            .rows
            .clone();

        let mut results = Vec::new();
        for base_row in base_rows {
            let mut scope = HashMap::new();
            scope.insert(table.to_string(), base_row.clone());
            let mut scopes = vec![scope];

            for join in joins {
                let join_rows = state
                    .tables
                    .get(&join.table)
                    .ok_or_else(|| OrmError::Storage(format!("no such table '{}'", join.table)))?
                    .rows
                    .clone();
                let mut next = Vec::new();
                for scope in &scopes {
                    let mut matched = false;
                    for candidate in &join_rows {
                        let mut trial = scope.clone();
                        trial.insert(join.reference_name().to_string(), candidate.clone());
                        let holds = join.on.iter().all(|(left, right)| {
                            match (lookup(&trial, table, left), lookup(&trial, table, right)) {
                                (Some(a), Some(b)) => a == b,
                                _ => false,
                            }
                        });
                        if holds {
                            matched = true;
                            next.push(trial);
                        }
                    }
                    if !matched && join.join_type == JoinType::Left {
                        next.push(scope.clone());
                    }
                }
                scopes = next;
            }

            for scope in scopes {
                let holds = conditions.iter().all(|(column, condition)| {
                    value_matches(lookup(&scope, table, column), condition)
                });
                if !holds {
                    continue;
                }
                let mut merged = scope.get(table).cloned().unwrap_or_default();
                for join in joins {
                    if let Some(row) = scope.get(join.reference_name()) {
                        for (key, value) in row {
                            merged.entry(key.clone()).or_insert_with(|| value.clone());
                        }
                    }
                }
                results.push(merged);
            }
        }

        Ok(apply_options(results, options))
    }

    async fn aggregate(&self, table: &str, options: &AggregateOptions) -> OrmResult<Vec<Row>> {
        self.check_fail(table)?;
        self.log
            .lock()
            .unwrap()
            .aggregates
            .push((table.to_string(), options.clone()));
        Ok(Vec::new())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.log
            .lock()
            .unwrap()
            .queries
            .push((sql.to_string(), params.to_vec()));
        if *self.fail_raw.lock().unwrap() {
            return Err(OrmError::Storage("injected raw query failure".to_string()));
        }
        Ok(self.query_result.lock().unwrap().clone())
    }

    async fn query_single(&self, sql: &str, params: &[Value]) -> OrmResult<Option<Row>> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.log
            .lock()
            .unwrap()
            .queries
            .push((sql.to_string(), params.to_vec()));
        if *self.fail_raw.lock().unwrap() {
            return Err(OrmError::Storage("injected raw query failure".to_string()));
        }
        Ok(0)
    }

    async fn begin_transaction(
        &self,
        isolation: Option<IsolationLevel>,
    ) -> OrmResult<Box<dyn TransactionScope>> {
        self.log.lock().unwrap().isolation_levels.push(isolation);
        let snapshot = self.state.lock().unwrap().clone();
        let child = MemoryAdapter {
            state: Arc::new(Mutex::new(snapshot)),
            log: self.log.clone(),
            fail_tables: self.fail_tables.clone(),
            fail_raw: self.fail_raw.clone(),
            query_result: self.query_result.clone(),
            dialect: self.dialect,
        };
        Ok(Box::new(MemoryTransaction {
            parent: self.state.clone(),
            child,
        }))
    }

    fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

/// Snapshot transaction: the child adapter works on a copy of the state;
/// commit swaps the copy in, rollback drops it.
struct MemoryTransaction {
    parent: Arc<Mutex<MemoryState>>,
    child: MemoryAdapter,
}

#[async_trait]
impl TransactionScope for MemoryTransaction {
    fn adapter(&self) -> Arc<dyn StorageAdapter> {
        Arc::new(self.child.clone())
    }

    async fn commit(self: Box<Self>) -> OrmResult<()> {
        let snapshot = self.child.state.lock().unwrap().clone();
        *self.parent.lock().unwrap() = snapshot;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> OrmResult<()> {
        Ok(())
    }
}
