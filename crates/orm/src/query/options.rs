//! Read options and aggregate descriptions passed through the DAO to the
//! storage adapter

use std::fmt;

use super::types::{Conditions, OrderDirection};

/// Options for read operations: projection, ordering, paging, and
/// relation names to expand into joins.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Columns to project; empty means all
    pub select: Vec<String>,
    pub order_by: Vec<(String, OrderDirection)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Declared relation names to expand into adapter-level joins
    pub relations: Vec<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.select = columns;
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

    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.relations.push(name.into());
        self
    }

    /// A copy with select/order columns rewritten through `translate`;
    /// relation names are consumed separately and stripped here.
    pub fn map_columns(&self, translate: impl Fn(&str) -> String) -> QueryOptions {
        QueryOptions {
            select: self.select.iter().map(|c| translate(c)).collect(),
            order_by: self
                .order_by
                .iter()
                .map(|(c, d)| (translate(c), *d))
                .collect(),
            limit: self.limit,
            offset: self.offset,
            relations: Vec::new(),
        }
    }
}

/// Aggregate functions supported by the builder glue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}

/// One aggregate projection: `FUNCTION(field) AS alias`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateField {
    pub function: AggregateFunction,
    /// Column reference or `*`
    pub field: String,
    pub alias: String,
}

impl AggregateField {
    pub fn new(
        function: AggregateFunction,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            function,
            field: field.into(),
            alias: alias.into(),
        }
    }

    pub fn count_all(alias: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Count, "*", alias)
    }

    /// The SQL projection fragment for this aggregate
    pub fn to_sql(&self) -> String {
        format!("{}({}) AS {}", self.function, self.field, self.alias)
    }
}

/// Options for the adapter's aggregate primitive
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub aggregates: Vec<AggregateField>,
    pub group_by: Vec<String>,
    pub conditions: Conditions,
    pub order_by: Vec<(String, OrderDirection)>,
    pub limit: Option<i64>,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregate(mut self, field: AggregateField) -> Self {
        self.aggregates.push(field);
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
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
}
