//! SQL dialect knowledge consumed by the query builder and the date
//! expression helpers. Concrete adapters report their dialect; everything
//! dialect-specific the DAO emits goes through here.

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl SqlDialect {
    /// Get the parameter placeholder for a zero-based parameter index
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Get the quote character for identifiers in this dialect
    pub fn identifier_quote(&self) -> char {
        match self {
            SqlDialect::PostgreSQL | SqlDialect::SQLite => '"',
            SqlDialect::MySQL => '`',
        }
    }

    /// Check if this dialect has a native boolean column type
    pub fn supports_boolean(&self) -> bool {
        match self {
            SqlDialect::PostgreSQL | SqlDialect::SQLite => true,
            SqlDialect::MySQL => false,
        }
    }

    /// Expression yielding the current date
    pub fn current_date(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL | SqlDialect::MySQL => "CURRENT_DATE",
            SqlDialect::SQLite => "date('now')",
        }
    }

    /// Expression yielding the current date and time
    pub fn current_date_time(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "NOW()",
            SqlDialect::MySQL => "CURRENT_TIMESTAMP",
            SqlDialect::SQLite => "datetime('now')",
        }
    }

    /// Expression computing the difference in whole days between two date
    /// expressions (`end - start`)
    pub fn date_diff(&self, start: &str, end: &str) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("DATE_PART('day', {} - {})", end, start),
            SqlDialect::MySQL => format!("DATEDIFF({}, {})", end, start),
            SqlDialect::SQLite => {
                format!("CAST(julianday({}) - julianday({}) AS INTEGER)", end, start)
            }
        }
    }
}

/// Dialect-specific date expression strings handed to the expression
/// helpers. Adapters expose one of these through
/// [`StorageAdapter::date_functions`](super::StorageAdapter::date_functions).
#[derive(Debug, Clone)]
pub struct DateFunctions {
    pub current_date: String,
    pub current_date_time: String,
    dialect: SqlDialect,
}

impl DateFunctions {
    pub fn for_dialect(dialect: SqlDialect) -> Self {
        Self {
            current_date: dialect.current_date().to_string(),
            current_date_time: dialect.current_date_time().to_string(),
            dialect,
        }
    }

    /// Render a day-difference expression between two date expressions
    pub fn date_diff(&self, start: &str, end: &str) -> String {
        self.dialect.date_diff(start, end)
    }
}

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Read Uncommitted - lowest isolation level
    ReadUncommitted,
    /// Read Committed - common engine default
    ReadCommitted,
    /// Repeatable Read - stronger consistency guarantees
    RepeatableRead,
    /// Serializable - highest isolation level
    Serializable,
}

impl IsolationLevel {
    /// Convert to SQL string for SET TRANSACTION ISOLATION LEVEL
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}
