//! Generic entity DAO
//!
//! `EntityDao<T, K>` is the CRUD engine built over one entity mapping and
//! one storage adapter handle. The implementation is decomposed into
//! focused files:
//!
//! - `crud`: find/count/exists/create/update/save/delete/bulk operations
//! - `relations`: relation traversal and junction management
//! - `aggregate`: aggregates and the raw-query escape hatch
//!
//! Error handling is split in two deliberate regimes. Convenience
//! read/write paths recover storage failures locally (logged, benign
//! empty/zero result); `create`, `bulk_create`, `save`, `transaction`,
//! relation configuration errors, and the raw-query family propagate.
//! Callers depend on this asymmetry.

pub mod aggregate;
pub mod crud;
pub mod relations;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::{IsolationLevel, Row, StorageAdapter};
use crate::error::{OrmError, OrmResult};
use crate::expr::SqlHelper;
use crate::mapping::{ColumnType, EntityMapping, Record};
use crate::query::{ConditionValue, Conditions, JoinClause, QueryOptions};
use crate::relations::expand_relation_joins;

/// Generic data access object for one entity type.
///
/// `T` is the entity representation (any `Serialize + DeserializeOwned`
/// type, including `Record` itself for fully dynamic access); `K` is the
/// identifier type, defaulting to `i64`.
///
/// A DAO instance holds exactly one adapter handle and must not be shared
/// across concurrent transactions; [`transaction`](EntityDao::transaction)
/// mints a fresh instance bound to the scoped connection instead of
/// mutating the caller's.
pub struct EntityDao<T, K = i64> {
    adapter: Arc<dyn StorageAdapter>,
    mapping: Arc<EntityMapping>,
    _marker: PhantomData<fn() -> (T, K)>,
}

impl<T, K> Clone for EntityDao<T, K> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            mapping: self.mapping.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, K> EntityDao<T, K>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    K: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(adapter: Arc<dyn StorageAdapter>, mapping: Arc<EntityMapping>) -> Self {
        Self {
            adapter,
            mapping,
            _marker: PhantomData,
        }
    }

    /// A DAO for the same entity bound to another connection handle.
    /// `transaction()` uses this to scope every callback operation to the
    /// transactional connection.
    pub fn with_connection(&self, handle: Arc<dyn StorageAdapter>) -> Self {
        Self {
            adapter: handle,
            mapping: self.mapping.clone(),
            _marker: PhantomData,
        }
    }

    pub fn mapping(&self) -> &EntityMapping {
        &self.mapping
    }

    pub fn adapter(&self) -> Arc<dyn StorageAdapter> {
        self.adapter.clone()
    }

    /// Expression builder for raw/CASE/date/subquery/BETWEEN fragments in
    /// the adapter's dialect
    pub fn sql(&self) -> SqlHelper {
        SqlHelper::new(self.adapter.date_functions())
    }

    /// Run `callback` inside a transaction with the adapter's default
    /// isolation. The callback receives a DAO bound to the transactional
    /// connection; all effects commit together or not at all.
    pub async fn transaction<R, F, Fut>(&self, callback: F) -> OrmResult<R>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = OrmResult<R>>,
    {
        self.run_transaction(callback, None).await
    }

    /// Run `callback` inside a transaction at the requested isolation
    /// level
    pub async fn transaction_with_isolation<R, F, Fut>(
        &self,
        callback: F,
        isolation: IsolationLevel,
    ) -> OrmResult<R>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = OrmResult<R>>,
    {
        self.run_transaction(callback, Some(isolation)).await
    }

    async fn run_transaction<R, F, Fut>(
        &self,
        callback: F,
        isolation: Option<IsolationLevel>,
    ) -> OrmResult<R>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = OrmResult<R>>,
    {
        let scope = self.adapter.begin_transaction(isolation).await?;
        let dao = self.with_connection(scope.adapter());
        debug!(entity = %self.mapping.entity_name, "transaction started");

        match callback(dao).await {
            Ok(value) => {
                scope.commit().await?;
                debug!(entity = %self.mapping.entity_name, "transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.rollback().await {
                    warn!(
                        entity = %self.mapping.entity_name,
                        error = %rollback_err,
                        "transaction rollback failed"
                    );
                }
                Err(err)
            }
        }
    }

    // ---- internal translation helpers -----------------------------------

    pub(crate) fn table(&self) -> &str {
        &self.mapping.table
    }

    pub(crate) fn entity_to_record(&self, entity: &T) -> OrmResult<Record> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(map),
            other => Err(OrmError::Serialization(format!(
                "entity '{}' must serialize to an object, got {}",
                self.mapping.entity_name,
                json_kind(&other)
            ))),
        }
    }

    /// Physical row → logical record, with read-side value coercion
    pub(crate) fn row_to_record(&self, row: &Row) -> Record {
        let mut record = self.mapping.record_to_logical(row);
        self.coerce_record_from_storage(&mut record);
        record
    }

    pub(crate) fn row_to_entity(&self, row: &Row) -> OrmResult<T> {
        let record = self.row_to_record(row);
        serde_json::from_value(Value::Object(record)).map_err(|err| {
            OrmError::Serialization(format!(
                "failed to deserialize '{}' row: {}",
                self.mapping.entity_name, err
            ))
        })
    }

    pub(crate) fn id_to_value(&self, id: &K) -> OrmResult<Value> {
        serde_json::to_value(id).map_err(Into::into)
    }

    pub(crate) fn value_to_id(&self, value: Value) -> OrmResult<K> {
        serde_json::from_value(value).map_err(|err| {
            OrmError::Serialization(format!(
                "failed to decode identifier for '{}': {}",
                self.mapping.entity_name, err
            ))
        })
    }

    /// Logical conditions → physical conditions, coercing boolean-typed
    /// values the same way the write path does so comparisons line up
    /// with stored `0/1` values.
    pub(crate) fn physical_conditions(&self, conditions: &Conditions) -> Conditions {
        let mut out = Conditions::new();
        for (column, value) in conditions.iter() {
            let is_boolean = self
                .mapping
                .column(column)
                .map_or(false, |c| c.is_type(ColumnType::Boolean));
            let value = if is_boolean {
                coerce_condition_booleans(value)
            } else {
                value.clone()
            };
            out.push(self.mapping.column_to_physical(column).to_string(), value);
        }
        out
    }

    /// Logical options → physical options plus the joins expanded from
    /// relation names
    pub(crate) fn physical_options(
        &self,
        options: &QueryOptions,
    ) -> OrmResult<(QueryOptions, Vec<JoinClause>)> {
        let joins = expand_relation_joins(&self.mapping, &options.relations)?;
        let physical = options.map_columns(|c| self.mapping.column_to_physical(c).to_string());
        Ok((physical, joins))
    }

    /// Stamp configured created/updated timestamp columns on create
    pub(crate) fn apply_create_timestamps(&self, record: &mut Record) {
        if let Some(timestamps) = &self.mapping.timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            for column in [&timestamps.created_at, &timestamps.updated_at]
                .into_iter()
                .flatten()
            {
                if self.mapping.column(column).is_some() {
                    record.insert(column.clone(), now.clone());
                }
            }
        }
    }

    /// Stamp the configured updated timestamp column on update
    pub(crate) fn apply_update_timestamp(&self, record: &mut Record) {
        if let Some(timestamps) = &self.mapping.timestamps {
            if let Some(column) = &timestamps.updated_at {
                if self.mapping.column(column).is_some() {
                    record.insert(column.clone(), Value::String(Utc::now().to_rfc3339()));
                }
            }
        }
    }

    /// Write-side value coercion: booleans to 0/1 (adapter portability),
    /// epoch-millisecond numbers on date columns to RFC 3339 strings,
    /// UUID sanity check on uuid columns.
    pub(crate) fn coerce_record_for_storage(&self, record: &mut Record) {
        for column in self.mapping.columns_by_type(&[ColumnType::Boolean]) {
            if let Some(value) = record.get_mut(&column.logical) {
                if let Value::Bool(b) = value {
                    *value = Value::from(if *b { 1 } else { 0 });
                }
            }
        }
        for column in self
            .mapping
            .columns_by_type(&[ColumnType::Date, ColumnType::DateTime])
        {
            if let Some(value) = record.get_mut(&column.logical) {
                if let Some(millis) = value.as_i64() {
                    if let Some(instant) = Utc.timestamp_millis_opt(millis).single() {
                        *value = Value::String(instant.to_rfc3339());
                    }
                }
            }
        }
        for column in self.mapping.columns_by_type(&[ColumnType::Uuid]) {
            if let Some(Value::String(raw)) = record.get(&column.logical) {
                if uuid::Uuid::parse_str(raw).is_err() {
                    warn!(
                        entity = %self.mapping.entity_name,
                        column = %column.logical,
                        "value is not a valid UUID"
                    );
                }
            }
        }
    }

    /// Read-side value coercion: 0/1 back to booleans on boolean columns
    pub(crate) fn coerce_record_from_storage(&self, record: &mut Record) {
        for column in self.mapping.columns_by_type(&[ColumnType::Boolean]) {
            if let Some(value) = record.get_mut(&column.logical) {
                if let Some(i) = value.as_i64() {
                    *value = Value::Bool(i != 0);
                }
            }
        }
    }
}

fn coerce_condition_booleans(value: &ConditionValue) -> ConditionValue {
    let map = |v: &Value| match v {
        Value::Bool(b) => Value::from(if *b { 1 } else { 0 }),
        other => other.clone(),
    };
    match value {
        ConditionValue::Eq(v) => ConditionValue::Eq(map(v)),
        ConditionValue::In(vs) => ConditionValue::In(vs.iter().map(map).collect()),
        ConditionValue::Expr(e) => ConditionValue::Expr(e.clone()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
