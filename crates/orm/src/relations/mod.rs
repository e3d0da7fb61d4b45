//! Relation model: declared associations between entity mappings
//!
//! A relation names its variant, the two entities it connects, and the
//! columns that connect them. Junction configuration exists only on the
//! many-to-many variant, so misconfigured junction-less many-to-many
//! relations are unrepresentable beyond empty strings (caught by
//! `validate`).

pub mod joins;

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};

pub use joins::{expand_relation_joins, junction_alias, target_alias};

/// The variant of a relation, with variant-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    OneToOne {
        /// True when the source entity carries the foreign key
        #[serde(default)]
        is_owner: bool,
    },
    OneToMany,
    ManyToOne,
    ManyToMany {
        junction_table: String,
        junction_source_column: String,
        junction_target_column: String,
    },
}

impl RelationKind {
    /// Human-readable variant name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::OneToOne { .. } => "one-to-one",
            RelationKind::OneToMany => "one-to-many",
            RelationKind::ManyToOne => "many-to-one",
            RelationKind::ManyToMany { .. } => "many-to-many",
        }
    }

    /// True when traversal yields a collection rather than a single row
    pub fn is_collection(&self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany { .. })
    }
}

/// A declared association between two entity mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Unique name within the source entity's mapping
    pub name: String,
    pub source_entity: String,
    pub target_entity: String,
    /// Physical table of the target entity
    pub target_table: String,
    /// Column on the source side of the association
    pub source_column: String,
    /// Column on the target side of the association
    pub target_column: String,
    #[serde(flatten)]
    pub kind: RelationKind,
}

impl Relation {
    fn new(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        target_table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            name: name.into(),
            source_entity: source_entity.into(),
            target_entity: target_entity.into(),
            target_table: target_table.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
            kind,
        }
    }

    pub fn one_to_one(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        target_table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        is_owner: bool,
    ) -> Self {
        Self::new(
            name,
            source_entity,
            target_entity,
            target_table,
            source_column,
            target_column,
            RelationKind::OneToOne { is_owner },
        )
    }

    pub fn one_to_many(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        target_table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            source_entity,
            target_entity,
            target_table,
            source_column,
            target_column,
            RelationKind::OneToMany,
        )
    }

    pub fn many_to_one(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        target_table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            source_entity,
            target_entity,
            target_table,
            source_column,
            target_column,
            RelationKind::ManyToOne,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn many_to_many(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        target_table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        junction_table: impl Into<String>,
        junction_source_column: impl Into<String>,
        junction_target_column: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            source_entity,
            target_entity,
            target_table,
            source_column,
            target_column,
            RelationKind::ManyToMany {
                junction_table: junction_table.into(),
                junction_source_column: junction_source_column.into(),
                junction_target_column: junction_target_column.into(),
            },
        )
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ManyToMany { .. })
    }

    /// Validate relation invariants: non-empty name/columns, and for
    /// many-to-many a fully specified junction.
    pub fn validate(&self) -> OrmResult<()> {
        if self.name.is_empty() {
            return Err(OrmError::Mapping("relation name cannot be empty".to_string()));
        }
        if self.source_column.is_empty() || self.target_column.is_empty() {
            return Err(OrmError::Mapping(format!(
                "relation '{}' must declare source and target columns",
                self.name
            )));
        }
        if let RelationKind::ManyToMany {
            junction_table,
            junction_source_column,
            junction_target_column,
        } = &self.kind
        {
            if junction_table.is_empty()
                || junction_source_column.is_empty()
                || junction_target_column.is_empty()
            {
                return Err(OrmError::Mapping(format!(
                    "many-to-many relation '{}' requires a junction table and both junction columns",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
