//! Error types for the entity data access layer
//!
//! The taxonomy mirrors the failure boundaries of the DAO: mapping
//! configuration problems, relation misuse, and storage adapter failures.
//! Serialization failures cover record/type conversion at the DAO surface.

use thiserror::Error;

/// Result type alias for DAO and mapping operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error type for all fallible operations in the crate
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Mapping configuration error: no resolvable primary key, or an
    /// unknown relation name referenced by a relation operation
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Relation add/remove invoked on a relation that is not many-to-many
    #[error("Relation type error: {0}")]
    RelationType(String),

    /// Failure surfaced by the storage adapter (connectivity, constraint
    /// violation, timeout)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record/entity conversion failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrmError {
    /// True when the error comes from the storage adapter rather than from
    /// configuration or conversion. Tolerant DAO paths swallow exactly
    /// these.
    pub fn is_storage(&self) -> bool {
        matches!(self, OrmError::Storage(_))
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for OrmError {
    fn from(err: anyhow::Error) -> Self {
        OrmError::Storage(err.to_string())
    }
}
