//! Column descriptors: one logical/physical pair per entity attribute

use serde::{Deserialize, Serialize};

/// Storage-facing type of a column, used to drive value coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    #[serde(alias = "long")]
    BigInt,
    #[serde(alias = "double")]
    Float,
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "bool")]
    Boolean,
    Date,
    #[serde(alias = "timestamp")]
    DateTime,
    Json,
    Uuid,
}

/// One column of an entity mapping: the logical name application code
/// uses, the physical name the table uses, and storage flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub logical: String,
    pub physical: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMapping {
    /// Create a column mapping with default flags
    pub fn new(logical: impl Into<String>, physical: impl Into<String>) -> Self {
        Self {
            logical: logical.into(),
            physical: physical.into(),
            column_type: None,
            primary_key: false,
            auto_increment: false,
            nullable: true,
            unique: false,
        }
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// True when the column has the given declared type
    pub fn is_type(&self, column_type: ColumnType) -> bool {
        self.column_type == Some(column_type)
    }
}
