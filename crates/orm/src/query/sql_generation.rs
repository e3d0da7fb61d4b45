//! SQL rendering for the query builder

use serde_json::Value;

use crate::expr::rewrite_placeholders;

use super::builder::{QueryBuilder, WhereEntry};

impl QueryBuilder {
    /// Render the statement with inline literals. This form is embeddable
    /// as a subquery.
    pub fn to_sql(&self) -> String {
        let mut sql = self.render_select_from();

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            let rendered: Vec<String> = self.wheres.iter().map(|e| self.render_inline(e)).collect();
            sql.push_str(&rendered.join(" AND "));
        }

        self.render_tail(&mut sql, |entry| self.render_inline(entry));
        sql
    }

    /// Render the statement with dialect placeholders, returning the
    /// parameter list alongside.
    pub fn to_sql_with_params(&self) -> (String, Vec<Value>) {
        let mut sql = self.render_select_from();
        let mut params = Vec::new();
        let mut index = 0usize;

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            let rendered: Vec<String> = self
                .wheres
                .iter()
                .map(|e| self.render_parameterized(e, &mut params, &mut index))
                .collect();
            sql.push_str(&rendered.join(" AND "));
        }

        // GROUP BY / HAVING / ORDER BY / LIMIT, threading the same counter
        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            let rendered: Vec<String> = self
                .having
                .iter()
                .map(|e| self.render_parameterized(e, &mut params, &mut index))
                .collect();
            sql.push_str(&rendered.join(" AND "));
        }
        self.render_order_limit(&mut sql);

        (sql, params)
    }

    fn render_select_from(&self) -> String {
        let mut sql = String::new();
        sql.push_str(if self.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });

        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        if let Some(table) = &self.from_table {
            sql.push_str(" FROM ");
            sql.push_str(table);
        }

        for join in &self.joins {
            sql.push_str(&format!(" {} {}", join.join_type, join.table_expr()));
            if !join.on.is_empty() {
                sql.push_str(" ON ");
                let conditions: Vec<String> = join
                    .on
                    .iter()
                    .map(|(left, right)| format!("{} = {}", left, right))
                    .collect();
                sql.push_str(&conditions.join(" AND "));
            }
        }

        sql
    }

    fn render_tail(&self, sql: &mut String, render: impl Fn(&WhereEntry) -> String) {
        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            let rendered: Vec<String> = self.having.iter().map(render).collect();
            sql.push_str(&rendered.join(" AND "));
        }
        self.render_order_limit(sql);
    }

    fn render_order_limit(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            let clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", clauses.join(", ")));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }

    fn render_inline(&self, entry: &WhereEntry) -> String {
        match entry {
            WhereEntry::Op {
                column,
                operator,
                value,
                values,
            } => {
                use super::types::QueryOperator::*;
                match operator {
                    IsNull | IsNotNull => format!("{} {}", column, operator),
                    In | NotIn => {
                        if values.is_empty() {
                            "1 = 0".to_string()
                        } else {
                            let list: Vec<String> =
                                values.iter().map(|v| format_value(v)).collect();
                            format!("{} {} ({})", column, operator, list.join(", "))
                        }
                    }
                    _ => match value {
                        Some(value) => {
                            format!("{} {} {}", column, operator, format_value(value))
                        }
                        None => format!("{} {} NULL", column, operator),
                    },
                }
            }
            WhereEntry::Raw(expr) => {
                // Splice params into the fragment's `?` slots as literals.
                let mut out = String::with_capacity(expr.sql.len());
                let mut params = expr.params.iter();
                for ch in expr.sql.chars() {
                    if ch == '?' {
                        match params.next() {
                            Some(value) => out.push_str(&format_value(value)),
                            None => out.push(ch),
                        }
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }

    fn render_parameterized(
        &self,
        entry: &WhereEntry,
        params: &mut Vec<Value>,
        index: &mut usize,
    ) -> String {
        match entry {
            WhereEntry::Op {
                column,
                operator,
                value,
                values,
            } => {
                use super::types::QueryOperator::*;
                match operator {
                    IsNull | IsNotNull => format!("{} {}", column, operator),
                    In | NotIn => {
                        if values.is_empty() {
                            "1 = 0".to_string()
                        } else {
                            let mut list = Vec::with_capacity(values.len());
                            for value in values {
                                list.push(self.dialect.parameter_placeholder(*index));
                                *index += 1;
                                params.push(value.clone());
                            }
                            format!("{} {} ({})", column, operator, list.join(", "))
                        }
                    }
                    _ => match value {
                        Some(value) => {
                            let placeholder = self.dialect.parameter_placeholder(*index);
                            *index += 1;
                            params.push(value.clone());
                            format!("{} {} {}", column, operator, placeholder)
                        }
                        None => format!("{} {} NULL", column, operator),
                    },
                }
            }
            WhereEntry::Raw(expr) => {
                let sql = rewrite_placeholders(&expr.sql, self.dialect, index);
                params.extend(expr.params.iter().cloned());
                sql
            }
        }
    }
}

/// Format a JSON value as a SQL literal (single quotes escaped)
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}
