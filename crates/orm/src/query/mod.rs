//! Query construction: conditions, options, joins, and the fluent builder
//!
//! - `types`: operators, conditions, join clauses, ordering
//! - `options`: read options and aggregate descriptions
//! - `builder` + `sql_generation`: fluent SELECT builder with dialect-aware
//!   rendering

pub mod builder;
pub mod options;
pub mod sql_generation;
pub mod types;

pub use builder::QueryBuilder;
pub use options::{AggregateField, AggregateFunction, AggregateOptions, QueryOptions};
pub use types::{ConditionValue, Conditions, JoinClause, JoinType, OrderDirection, QueryOperator};
