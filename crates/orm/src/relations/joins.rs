//! Expansion of declared relation names into adapter-level joins
//!
//! Aliasing is deterministic so generated SQL is stable: the target table
//! is aliased by its first character, and many-to-many junction tables by
//! `"j_" + relation name`.

use crate::error::{OrmError, OrmResult};
use crate::mapping::EntityMapping;
use crate::query::JoinClause;

use super::{Relation, RelationKind};

/// Alias for a many-to-many junction table
pub fn junction_alias(relation_name: &str) -> String {
    format!("j_{}", relation_name)
}

/// Alias for a joined target table: its first character
pub fn target_alias(table: &str) -> String {
    table.chars().take(1).collect()
}

/// Expand one declared relation into its join clause(s).
///
/// Many-to-many produces the double join source→junction→target (both
/// inner, mirroring relation traversal); every other variant produces a
/// single left join keyed on the declared source/target columns.
pub fn relation_joins(mapping: &EntityMapping, relation: &Relation) -> Vec<JoinClause> {
    let source_column = mapping.column_to_physical(&relation.source_column);
    match &relation.kind {
        RelationKind::ManyToMany {
            junction_table,
            junction_source_column,
            junction_target_column,
        } => {
            let junction = junction_alias(&relation.name);
            let target = target_alias(&relation.target_table);
            vec![
                JoinClause::inner(junction_table.clone())
                    .with_alias(junction.clone())
                    .on(
                        format!("{}.{}", mapping.table, source_column),
                        format!("{}.{}", junction, junction_source_column),
                    ),
                JoinClause::inner(relation.target_table.clone())
                    .with_alias(target.clone())
                    .on(
                        format!("{}.{}", junction, junction_target_column),
                        format!("{}.{}", target, relation.target_column),
                    ),
            ]
        }
        _ => {
            let target = target_alias(&relation.target_table);
            vec![JoinClause::left(relation.target_table.clone())
                .with_alias(target.clone())
                .on(
                    format!("{}.{}", mapping.table, source_column),
                    format!("{}.{}", target, relation.target_column),
                )]
        }
    }
}

/// Expand a list of relation names into join clauses, in order. Unknown
/// names are mapping errors.
pub fn expand_relation_joins(
    mapping: &EntityMapping,
    relation_names: &[String],
) -> OrmResult<Vec<JoinClause>> {
    let mut joins = Vec::new();
    for name in relation_names {
        let relation = mapping.relation(name).ok_or_else(|| {
            OrmError::Mapping(format!(
                "unknown relation '{}' on entity '{}'",
                name, mapping.entity_name
            ))
        })?;
        joins.extend(relation_joins(mapping, relation));
    }
    Ok(joins)
}
