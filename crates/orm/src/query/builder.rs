//! Fluent query builder
//!
//! Adapters hand out a builder preconfigured with their dialect; the DAO
//! and callers compose SELECT statements with it. `to_sql()` renders an
//! embeddable statement with inline literals (for subqueries);
//! `to_sql_with_params()` renders parameterized SQL in the dialect's
//! placeholder style.

use serde_json::Value;

use crate::adapter::SqlDialect;
use crate::expr::SqlExpr;

use super::types::{JoinClause, OrderDirection, QueryOperator};

#[derive(Debug, Clone)]
pub(crate) enum WhereEntry {
    Op {
        column: String,
        operator: QueryOperator,
        value: Option<Value>,
        values: Vec<Value>,
    },
    Raw(SqlExpr),
}

/// Builder for SELECT statements
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) dialect: SqlDialect,
    pub(crate) select_fields: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) from_table: Option<String>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<WhereEntry>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Vec<WhereEntry>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl QueryBuilder {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            select_fields: Vec::new(),
            distinct: false,
            from_table: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, fields: Vec<String>) -> Self {
        self.select_fields = fields;
        self
    }

    /// Add a raw projection fragment (aggregate call, expression, …)
    pub fn select_raw(mut self, fragment: impl Into<String>) -> Self {
        self.select_fields.push(fragment.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from_table = Some(table.into());
        self
    }

    pub fn join(mut self, clause: JoinClause) -> Self {
        self.joins.push(clause);
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op(column, QueryOperator::Equal, value)
    }

    pub fn where_op(
        mut self,
        column: impl Into<String>,
        operator: QueryOperator,
        value: impl Into<Value>,
    ) -> Self {
        self.wheres.push(WhereEntry::Op {
            column: column.into(),
            operator,
            value: Some(value.into()),
            values: Vec::new(),
        });
        self
    }

    pub fn where_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.wheres.push(WhereEntry::Op {
            column: column.into(),
            operator: QueryOperator::In,
            value: None,
            values,
        });
        self
    }

    pub fn where_null(mut self, column: impl Into<String>) -> Self {
        self.wheres.push(WhereEntry::Op {
            column: column.into(),
            operator: QueryOperator::IsNull,
            value: None,
            values: Vec::new(),
        });
        self
    }

    pub fn where_raw(mut self, expr: SqlExpr) -> Self {
        self.wheres.push(WhereEntry::Raw(expr));
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having_raw(mut self, expr: SqlExpr) -> Self {
        self.having.push(WhereEntry::Raw(expr));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}
