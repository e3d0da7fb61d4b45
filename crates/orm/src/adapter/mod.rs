//! Storage adapter contract
//!
//! The DAO delegates every database round-trip to an implementation of
//! [`StorageAdapter`]. Concrete adapters (one per storage engine) live
//! outside this crate; the trait pins down the primitive operations the
//! DAO composes: keyed CRUD, joined reads, aggregates, raw SQL, and
//! transaction scoping.
//!
//! Rows cross this boundary as JSON maps keyed by *physical* column names.
//! The DAO owns all logical/physical translation; adapters never see
//! logical names.

pub mod dialect;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OrmResult;
use crate::query::{AggregateOptions, Conditions, JoinClause, QueryBuilder, QueryOptions};

pub use dialect::{DateFunctions, IsolationLevel, SqlDialect};

/// A database row keyed by physical column names
pub type Row = serde_json::Map<String, Value>;

/// Primitive storage operations over one connection handle (a pool, a
/// single connection, or a transaction scope).
///
/// All operations are non-blocking; concurrency characteristics are
/// inherited entirely from the adapter's connection pool. The trait
/// performs no caching and no retries.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn find_all(&self, table: &str, options: &QueryOptions) -> OrmResult<Vec<Row>>;

    async fn find_by(
        &self,
        table: &str,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> OrmResult<Vec<Row>>;

    async fn find_one_by(
        &self,
        table: &str,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> OrmResult<Option<Row>>;

    async fn find_by_id(&self, table: &str, id_column: &str, id: &Value)
        -> OrmResult<Option<Row>>;

    async fn count(&self, table: &str, conditions: &Conditions) -> OrmResult<u64>;

    async fn exists(&self, table: &str, id_column: &str, id: &Value) -> OrmResult<bool>;

    /// Insert one row and return the new identifier value
    async fn insert(&self, table: &str, row: Row) -> OrmResult<Value>;

    /// Insert many rows in one batch and return the inserted count
    async fn bulk_insert(&self, table: &str, rows: Vec<Row>) -> OrmResult<u64>;

    async fn update(
        &self,
        table: &str,
        id_column: &str,
        id: &Value,
        changes: Row,
    ) -> OrmResult<u64>;

    async fn update_by(&self, table: &str, conditions: &Conditions, changes: Row)
        -> OrmResult<u64>;

    async fn delete(&self, table: &str, id_column: &str, id: &Value) -> OrmResult<u64>;

    async fn delete_by(&self, table: &str, conditions: &Conditions) -> OrmResult<u64>;

    /// Read from `table` joined through `joins`, in declaration order.
    /// Condition columns may be alias-qualified (`"j_tags.post_id"`).
    async fn find_with_join(
        &self,
        table: &str,
        joins: &[JoinClause],
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> OrmResult<Vec<Row>>;

    /// Grouped aggregate over one table
    async fn aggregate(&self, table: &str, options: &AggregateOptions) -> OrmResult<Vec<Row>>;

    /// Execute raw SQL returning rows
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>>;

    /// Execute raw SQL returning at most one row
    async fn query_single(&self, sql: &str, params: &[Value]) -> OrmResult<Option<Row>>;

    /// Execute raw SQL returning the affected row count
    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64>;

    /// Open a transaction on a dedicated connection. Every operation issued
    /// through the returned scope's handle executes on that connection in
    /// program order until commit or rollback.
    async fn begin_transaction(
        &self,
        isolation: Option<IsolationLevel>,
    ) -> OrmResult<Box<dyn TransactionScope>>;

    /// The SQL dialect this adapter speaks
    fn dialect(&self) -> SqlDialect;

    /// A fluent query builder preconfigured for this adapter's dialect
    fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.dialect())
    }

    /// Dialect-specific date expression strings
    fn date_functions(&self) -> DateFunctions {
        DateFunctions::for_dialect(self.dialect())
    }
}

/// An open transaction: a scoped connection handle plus commit/rollback.
///
/// The handle returned by [`adapter`](TransactionScope::adapter) must not
/// outlive the scope; the DAO enforces this by minting a fresh,
/// transaction-bound instance for the duration of the callback and
/// dropping it before resolution.
#[async_trait]
pub trait TransactionScope: Send + Sync {
    /// The connection handle scoped to this transaction
    fn adapter(&self) -> Arc<dyn StorageAdapter>;

    /// Commit all effects of the transaction
    async fn commit(self: Box<Self>) -> OrmResult<()>;

    /// Discard all effects of the transaction
    async fn rollback(self: Box<Self>) -> OrmResult<()>;
}
