//! Entity mapping: the static descriptor translating one entity type
//! between its logical and physical representations.
//!
//! A mapping is constructed once at application start (typically
//! deserialized from configuration), validated, and shared read-only by
//! every DAO instance for that entity. All translation utilities are pure
//! and total: unknown keys pass through unchanged so callers can mix
//! mapped fields with raw SQL fragments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OrmError, OrmResult};
use crate::relations::Relation;

use super::column::{ColumnMapping, ColumnType};

/// A logical entity record keyed by logical column names
pub type Record = serde_json::Map<String, Value>;

/// Logical column names the DAO stamps on create/update when configured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestampConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Soft-delete policy: deletes become updates setting `column` to
/// `deleted_value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    pub column: String,
    pub deleted_value: Value,
    pub non_deleted_value: Value,
}

/// Static description of an entity: table, primary key, ordered columns,
/// declared relations, and timestamp/soft-delete policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub entity_name: String,
    pub table: String,
    /// Logical name of the primary key field
    pub id_field: String,
    #[serde(default)]
    pub columns: Vec<ColumnMapping>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<TimestampConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete: Option<SoftDeleteConfig>,
}

impl EntityMapping {
    /// Create an empty mapping; populate with the builder methods
    pub fn new(
        entity_name: impl Into<String>,
        table: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            table: table.into(),
            id_field: id_field.into(),
            columns: Vec::new(),
            relations: Vec::new(),
            timestamps: None,
            soft_delete: None,
        }
    }

    pub fn with_column(mut self, column: ColumnMapping) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_timestamps(mut self, timestamps: TimestampConfig) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn with_soft_delete(mut self, soft_delete: SoftDeleteConfig) -> Self {
        self.soft_delete = Some(soft_delete);
        self
    }

    /// Validate mapping invariants: unique logical names, unique relation
    /// names, at most one explicit primary key, a resolvable primary key,
    /// and well-formed relations.
    pub fn validate(&self) -> OrmResult<()> {
        let mut seen = HashMap::new();
        for column in &self.columns {
            if seen.insert(column.logical.as_str(), ()).is_some() {
                return Err(OrmError::Mapping(format!(
                    "duplicate logical column '{}' in mapping for entity '{}'",
                    column.logical, self.entity_name
                )));
            }
        }

        let explicit = self.columns.iter().filter(|c| c.primary_key).count();
        if explicit > 1 {
            return Err(OrmError::Mapping(format!(
                "multiple primary key columns in mapping for entity '{}'",
                self.entity_name
            )));
        }
        self.primary_key_column()?;

        let mut names = HashMap::new();
        for relation in &self.relations {
            relation.validate()?;
            if names.insert(relation.name.as_str(), ()).is_some() {
                return Err(OrmError::Mapping(format!(
                    "duplicate relation '{}' in mapping for entity '{}'",
                    relation.name, self.entity_name
                )));
            }
        }

        Ok(())
    }

    /// Look up a column by its logical name
    pub fn column(&self, logical: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.logical == logical)
    }

    /// Look up a column by its physical name
    pub fn column_by_physical(&self, physical: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.physical == physical)
    }

    /// Translate a logical column name to its physical name.
    ///
    /// Tolerant fallback: when no column matches, the input is returned
    /// unchanged. Callers may reference raw SQL fragments or
    /// alias-qualified names that are not mapped columns; those must keep
    /// working.
    pub fn column_to_physical<'a>(&'a self, logical: &'a str) -> &'a str {
        self.column(logical).map_or(logical, |c| c.physical.as_str())
    }

    /// Translate a physical column name back to its logical name, with the
    /// same tolerant fallback.
    pub fn column_to_logical<'a>(&'a self, physical: &'a str) -> &'a str {
        self.column_by_physical(physical)
            .map_or(physical, |c| c.logical.as_str())
    }

    /// Translate a logical record into a physical row, key by key. Unknown
    /// keys pass through unchanged, never dropped.
    pub fn record_to_physical(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(key, value)| (self.column_to_physical(key).to_string(), value.clone()))
            .collect()
    }

    /// Translate a physical row into a logical record using a reverse
    /// index over the physical names. Unknown keys pass through unchanged.
    pub fn record_to_logical(&self, row: &Record) -> Record {
        let reverse: HashMap<&str, &str> = self
            .columns
            .iter()
            .map(|c| (c.physical.as_str(), c.logical.as_str()))
            .collect();
        row.iter()
            .map(|(key, value)| {
                let logical = reverse.get(key.as_str()).copied().unwrap_or(key.as_str());
                (logical.to_string(), value.clone())
            })
            .collect()
    }

    /// Resolve the primary key column: the column flagged `primary_key`,
    /// else the column whose logical name equals `id_field`.
    pub fn primary_key_column(&self) -> OrmResult<&ColumnMapping> {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .or_else(|| self.column(&self.id_field))
            .ok_or_else(|| {
                OrmError::Mapping(format!(
                    "no primary key found for entity '{}'",
                    self.entity_name
                ))
            })
    }

    /// Columns declared with one of the given types. Used to discover
    /// boolean/date columns for value coercion.
    pub fn columns_by_type(&self, types: &[ColumnType]) -> Vec<&ColumnMapping> {
        self.columns
            .iter()
            .filter(|c| c.column_type.map_or(false, |t| types.contains(&t)))
            .collect()
    }

    /// Look up a declared relation by name
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }
}
