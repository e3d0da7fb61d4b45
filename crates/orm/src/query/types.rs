//! Core types for query construction

use std::fmt;

use serde_json::Value;

use crate::expr::SqlExpr;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Full => write!(f, "FULL JOIN"),
        }
    }
}

/// One join in a query: type, target table, optional alias, and ON
/// column pairs (`left = right`, both sides already qualified).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub on: Vec<(String, String)>,
}

impl JoinClause {
    pub fn inner(table: impl Into<String>) -> Self {
        Self::new(JoinType::Inner, table)
    }

    pub fn left(table: impl Into<String>) -> Self {
        Self::new(JoinType::Left, table)
    }

    fn new(join_type: JoinType, table: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            on: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn on(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.on.push((left.into(), right.into()));
        self
    }

    /// Name the joined rows are addressed by: the alias when set, else the
    /// table name
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// The `table` / `table AS alias` fragment for SQL assembly
    pub fn table_expr(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.table, alias),
            None => self.table.clone(),
        }
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// The value side of one condition entry
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Plain equality against a single value
    Eq(Value),
    /// Membership in an explicit list. An empty list compiles to an
    /// always-false predicate, never to malformed SQL.
    In(Vec<Value>),
    /// A pre-built SQL fragment, embedded as-is with its parameters
    Expr(SqlExpr),
}

impl From<Value> for ConditionValue {
    /// JSON arrays become IN lists; everything else is an equality match
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => ConditionValue::In(values),
            other => ConditionValue::Eq(other),
        }
    }
}

impl From<SqlExpr> for ConditionValue {
    fn from(expr: SqlExpr) -> Self {
        ConditionValue::Expr(expr)
    }
}

/// An ordered set of conditions, keyed by column name. Entries combine
/// with AND; insertion order is preserved so generated SQL is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: Vec<(String, ConditionValue)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality (or, for array values, an IN-list) condition
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.entries.push((column.into(), value.into()));
        self
    }

    /// Add an explicit IN-list condition
    pub fn in_list(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.entries.push((column.into(), ConditionValue::In(values)));
        self
    }

    /// Add a pre-built SQL fragment condition
    pub fn expr(mut self, column: impl Into<String>, expr: SqlExpr) -> Self {
        self.entries.push((column.into(), ConditionValue::Expr(expr)));
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: ConditionValue) {
        self.entries.push((column.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ConditionValue)> {
        self.entries.iter()
    }

    /// A copy with every column name rewritten through `translate`. Used
    /// by the DAO for logical→physical translation.
    pub fn map_columns(&self, translate: impl Fn(&str) -> String) -> Conditions {
        Conditions {
            entries: self
                .entries
                .iter()
                .map(|(column, value)| (translate(column), value.clone()))
                .collect(),
        }
    }
}
