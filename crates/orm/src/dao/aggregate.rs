//! Aggregates and the raw-query escape hatch
//!
//! `aggregate` follows the tolerant convenience contract.
//! `complex_aggregate` and the `execute_raw_query*` methods are the one
//! family that surfaces adapter failures directly to the caller.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::OrmResult;
use crate::expr::{rewrite_placeholders, SqlExpr};
use crate::mapping::Record;
use crate::query::{AggregateField, AggregateOptions, ConditionValue, Conditions};

use super::EntityDao;

impl<T, K> EntityDao<T, K>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    K: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Grouped aggregate through the adapter's aggregate primitive.
    /// Aggregate fields, grouping, conditions, and ordering are translated
    /// from logical to physical names first. Empty on storage failure.
    pub async fn aggregate(&self, options: &AggregateOptions) -> Vec<Record> {
        let physical = AggregateOptions {
            aggregates: options
                .aggregates
                .iter()
                .map(|a| self.physical_aggregate(a))
                .collect(),
            group_by: options
                .group_by
                .iter()
                .map(|c| self.mapping().column_to_physical(c).to_string())
                .collect(),
            conditions: self.physical_conditions(&options.conditions),
            order_by: options
                .order_by
                .iter()
                .map(|(c, d)| (self.mapping().column_to_physical(c).to_string(), *d))
                .collect(),
            limit: options.limit,
        };

        match self.adapter().aggregate(self.table(), &physical).await {
            Ok(rows) => rows.iter().map(|row| self.row_to_record(row)).collect(),
            Err(err) => {
                self.log_recovered("aggregate", &err);
                Vec::new()
            }
        }
    }

    /// Hand-assembled aggregate statement:
    /// `SELECT aggregates [, group fields] FROM table [WHERE …]
    /// [GROUP BY …] [HAVING …]`.
    ///
    /// Every condition value is parameterized except pre-built expression
    /// fragments (embedded with their own parameters) and explicit IN
    /// lists (expanded to one placeholder per element; an empty list
    /// compiles to an always-false predicate). Errors propagate.
    pub async fn complex_aggregate(
        &self,
        aggregates: &[AggregateField],
        group_by: &[String],
        conditions: &Conditions,
        having: Option<&SqlExpr>,
    ) -> OrmResult<Vec<Record>> {
        let dialect = self.adapter().dialect();

        let mut select_parts: Vec<String> = aggregates
            .iter()
            .map(|a| self.physical_aggregate(a).to_sql())
            .collect();
        let group_fields: Vec<String> = group_by
            .iter()
            .map(|c| self.mapping().column_to_physical(c).to_string())
            .collect();
        select_parts.extend(group_fields.iter().cloned());

        let mut sql = format!("SELECT {} FROM {}", select_parts.join(", "), self.table());
        let mut params: Vec<Value> = Vec::new();
        let mut index = 0usize;

        let physical_conditions = self.physical_conditions(conditions);
        if !physical_conditions.is_empty() {
            let mut predicates = Vec::with_capacity(physical_conditions.len());
            for (column, value) in physical_conditions.iter() {
                match value {
                    ConditionValue::Eq(v) => {
                        predicates.push(format!(
                            "{} = {}",
                            column,
                            dialect.parameter_placeholder(index)
                        ));
                        index += 1;
                        params.push(v.clone());
                    }
                    ConditionValue::In(values) if values.is_empty() => {
                        predicates.push("1 = 0".to_string());
                    }
                    ConditionValue::In(values) => {
                        let mut placeholders = Vec::with_capacity(values.len());
                        for v in values {
                            placeholders.push(dialect.parameter_placeholder(index));
                            index += 1;
                            params.push(v.clone());
                        }
                        predicates.push(format!("{} IN ({})", column, placeholders.join(", ")));
                    }
                    ConditionValue::Expr(expr) => {
                        predicates.push(rewrite_placeholders(&expr.sql, dialect, &mut index));
                        params.extend(expr.params.iter().cloned());
                    }
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if !group_fields.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_fields.join(", "));
        }

        if let Some(having) = having {
            sql.push_str(" HAVING ");
            sql.push_str(&rewrite_placeholders(&having.sql, dialect, &mut index));
            params.extend(having.params.iter().cloned());
        }

        debug!(entity = %self.mapping().entity_name, sql = %sql, "complex aggregate");
        let rows = self.adapter().query(&sql, &params).await?;
        Ok(rows.iter().map(|row| self.row_to_record(row)).collect())
    }

    /// Execute raw SQL for queries the builder cannot express. Result
    /// rows are still translated back to logical form. Errors propagate.
    pub async fn execute_raw_query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> OrmResult<Vec<Record>> {
        let rows = self.adapter().query(sql, params).await?;
        Ok(rows.iter().map(|row| self.row_to_record(row)).collect())
    }

    /// Single-row variant of [`execute_raw_query`](EntityDao::execute_raw_query)
    pub async fn execute_raw_query_single(
        &self,
        sql: &str,
        params: &[Value],
    ) -> OrmResult<Option<Record>> {
        let row = self.adapter().query_single(sql, params).await?;
        Ok(row.map(|row| self.row_to_record(&row)))
    }

    fn physical_aggregate(&self, field: &AggregateField) -> AggregateField {
        let physical = if field.field == "*" {
            "*".to_string()
        } else {
            self.mapping().column_to_physical(&field.field).to_string()
        };
        AggregateField::new(field.function, physical, field.alias.clone())
    }
}
