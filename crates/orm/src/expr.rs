//! Opaque SQL expression fragments
//!
//! The `sql()` helper on the DAO builds `SqlExpr` fragments for constructs
//! the condition model cannot express: raw SQL, CASE expressions, date
//! comparisons, subqueries, and BETWEEN ranges. The DAO never interprets a
//! fragment; it embeds the SQL verbatim and threads the parameters through
//! to the adapter.
//!
//! Fragments always use `?` placeholders; whoever assembles the final
//! statement rewrites them into the adapter dialect's style.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::DateFunctions;
use crate::query::{QueryBuilder, QueryOperator};

/// A SQL fragment plus its positional parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlExpr {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl SqlExpr {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Expression builder handed out by `EntityDao::sql()`. Carries the
/// adapter's date functions so date expressions come out in the right
/// dialect.
#[derive(Debug, Clone)]
pub struct SqlHelper {
    date_functions: DateFunctions,
}

impl SqlHelper {
    pub fn new(date_functions: DateFunctions) -> Self {
        Self { date_functions }
    }

    /// A verbatim fragment with explicit parameters
    pub fn raw(&self, sql: impl Into<String>, params: Vec<Value>) -> SqlExpr {
        SqlExpr::new(sql, params)
    }

    /// `CASE WHEN … THEN ? [WHEN …]* [ELSE ?] END`; each branch value is
    /// parameterized, branch conditions are raw SQL
    pub fn case_when(&self, cases: &[(&str, Value)], else_value: Option<Value>) -> SqlExpr {
        let mut sql = String::from("CASE");
        let mut params = Vec::new();
        for (condition, value) in cases {
            sql.push_str(&format!(" WHEN {} THEN ?", condition));
            params.push(value.clone());
        }
        if let Some(value) = else_value {
            sql.push_str(" ELSE ?");
            params.push(value);
        }
        sql.push_str(" END");
        SqlExpr::new(sql, params)
    }

    /// Compare the number of days elapsed since `column` against `days`
    pub fn date_compare(&self, column: &str, operator: QueryOperator, days: i64) -> SqlExpr {
        let diff = self
            .date_functions
            .date_diff(column, &self.date_functions.current_date);
        SqlExpr::new(format!("{} {} ?", diff, operator), vec![Value::from(days)])
    }

    /// Embed a built query as a parenthesized subquery
    pub fn subquery(&self, builder: &QueryBuilder) -> SqlExpr {
        SqlExpr::new(format!("({})", builder.to_sql()), Vec::new())
    }

    /// `column BETWEEN ? AND ?`
    pub fn between(&self, column: &str, low: Value, high: Value) -> SqlExpr {
        SqlExpr::new(format!("{} BETWEEN ? AND ?", column), vec![low, high])
    }
}

/// Rewrite `?` placeholders in a fragment into the dialect's style,
/// continuing from `next_index` (zero-based). Returns the rewritten SQL
/// and advances the index by the number of placeholders consumed.
pub(crate) fn rewrite_placeholders(
    sql: &str,
    dialect: crate::adapter::SqlDialect,
    next_index: &mut usize,
) -> String {
    let mut out = String::with_capacity(sql.len());
    for ch in sql.chars() {
        if ch == '?' {
            out.push_str(&dialect.parameter_placeholder(*next_index));
            *next_index += 1;
        } else {
            out.push(ch);
        }
    }
    out
}
