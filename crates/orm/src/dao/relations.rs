//! Relation traversal and junction management
//!
//! `find_related` dispatches on the relation variant; `add_relation` and
//! `remove_relation` manage junction rows and are valid only for
//! many-to-many relations. Unknown relation names and wrong-variant calls
//! fail loudly; storage failures on the traversal legs follow the
//! tolerant convenience contract.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::adapter::Row;
use crate::error::{OrmError, OrmResult};
use crate::query::{Conditions, JoinClause, QueryOptions};
use crate::relations::{junction_alias, Relation, RelationKind};

use super::EntityDao;

impl<T, K> EntityDao<T, K>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    K: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Rows related to the entity `id` through the named relation.
    ///
    /// Returned rows come straight from the adapter and are keyed by the
    /// *target* table's physical column names; they are not translated
    /// through the target entity's own mapping (this DAO only holds the
    /// source mapping). Callers deserialize or re-map them as needed.
    pub async fn find_related(
        &self,
        id: &K,
        relation_name: &str,
        options: &QueryOptions,
    ) -> OrmResult<Vec<Row>> {
        let relation = self.relation(relation_name)?;
        let id_value = self.id_to_value(id)?;

        match &relation.kind {
            RelationKind::ManyToMany {
                junction_table,
                junction_source_column,
                junction_target_column,
            } => {
                let junction = junction_alias(&relation.name);
                let join = JoinClause::inner(junction_table.clone())
                    .with_alias(junction.clone())
                    .on(
                        format!("{}.{}", junction, junction_target_column),
                        format!("{}.{}", relation.target_table, relation.target_column),
                    );
                let conditions = Conditions::new()
                    .eq(format!("{}.{}", junction, junction_source_column), id_value);
                let result = self
                    .adapter()
                    .find_with_join(&relation.target_table, &[join], &conditions, options)
                    .await;
                self.related_rows(result, relation_name)
            }
            RelationKind::OneToMany => {
                let conditions =
                    Conditions::new().eq(relation.target_column.clone(), id_value);
                let result = self
                    .adapter()
                    .find_by(&relation.target_table, &conditions, options)
                    .await;
                self.related_rows(result, relation_name)
            }
            RelationKind::ManyToOne => {
                self.find_related_via_source_key(relation, &id_value, options)
                    .await
            }
            RelationKind::OneToOne { is_owner } => {
                if *is_owner {
                    self.find_related_via_source_key(relation, &id_value, options)
                        .await
                } else {
                    let conditions =
                        Conditions::new().eq(relation.target_column.clone(), id_value);
                    let result = self
                        .adapter()
                        .find_by(&relation.target_table, &conditions, options)
                        .await;
                    self.related_rows(result, relation_name)
                }
            }
        }
    }

    /// Insert a junction row pairing `id` with `target_id`. Valid only
    /// for many-to-many relations. Idempotent: an existing pairing
    /// reports success without a duplicate insert.
    pub async fn add_relation(
        &self,
        id: &K,
        relation_name: &str,
        target_id: Value,
    ) -> OrmResult<bool> {
        let relation = self.relation(relation_name)?;
        let (junction_table, source_column, target_column) =
            self.junction_of(relation, "add_relation")?;
        let id_value = self.id_to_value(id)?;

        let pairing = Conditions::new()
            .eq(source_column.clone(), id_value.clone())
            .eq(target_column.clone(), target_id.clone());

        match self
            .adapter()
            .find_one_by(&junction_table, &pairing, &QueryOptions::new())
            .await
        {
            Ok(Some(_)) => {
                debug!(
                    entity = %self.mapping().entity_name,
                    relation = relation_name,
                    "relation pairing already exists"
                );
                return Ok(true);
            }
            Ok(None) => {}
            Err(err) => {
                self.log_recovered("add_relation", &err);
                return Ok(false);
            }
        }

        let mut row = Row::new();
        row.insert(source_column, id_value);
        row.insert(target_column, target_id);
        match self.adapter().insert(&junction_table, row).await {
            Ok(_) => Ok(true),
            Err(err) => {
                self.log_recovered("add_relation", &err);
                Ok(false)
            }
        }
    }

    /// Remove the junction row pairing `id` with `target_id`. Valid only
    /// for many-to-many relations. Returns whether a pairing was removed.
    pub async fn remove_relation(
        &self,
        id: &K,
        relation_name: &str,
        target_id: Value,
    ) -> OrmResult<bool> {
        let relation = self.relation(relation_name)?;
        let (junction_table, source_column, target_column) =
            self.junction_of(relation, "remove_relation")?;
        let id_value = self.id_to_value(id)?;

        let pairing = Conditions::new()
            .eq(source_column, id_value)
            .eq(target_column, target_id);

        match self.adapter().delete_by(&junction_table, &pairing).await {
            Ok(affected) => Ok(affected > 0),
            Err(err) => {
                self.log_recovered("remove_relation", &err);
                Ok(false)
            }
        }
    }

    // ---- internals -------------------------------------------------------

    fn relation(&self, name: &str) -> OrmResult<&Relation> {
        self.mapping().relation(name).ok_or_else(|| {
            OrmError::Mapping(format!(
                "unknown relation '{}' on entity '{}'",
                name,
                self.mapping().entity_name
            ))
        })
    }

    fn junction_of(
        &self,
        relation: &Relation,
        operation: &str,
    ) -> OrmResult<(String, String, String)> {
        match &relation.kind {
            RelationKind::ManyToMany {
                junction_table,
                junction_source_column,
                junction_target_column,
            } => Ok((
                junction_table.clone(),
                junction_source_column.clone(),
                junction_target_column.clone(),
            )),
            other => Err(OrmError::RelationType(format!(
                "{} requires a many-to-many relation, but '{}' is {}",
                operation,
                relation.name,
                other.name()
            ))),
        }
    }

    /// Foreign-key dereference shared by many-to-one and owning
    /// one-to-one: load the source row, read the key from the source
    /// column, then query the target. Empty when the source row or its
    /// key is absent.
    async fn find_related_via_source_key(
        &self,
        relation: &Relation,
        id_value: &Value,
        options: &QueryOptions,
    ) -> OrmResult<Vec<Row>> {
        let pk = self.mapping().primary_key_column()?;
        let source_column = self.mapping().column_to_physical(&relation.source_column);

        let source_row = match self
            .adapter()
            .find_by_id(self.table(), &pk.physical, id_value)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                self.log_recovered("find_related", &err);
                return Ok(Vec::new());
            }
        };

        let foreign_key = match source_row.as_ref().and_then(|row| row.get(source_column)) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(Vec::new()),
        };

        let conditions = Conditions::new().eq(relation.target_column.clone(), foreign_key);
        let result = self
            .adapter()
            .find_by(&relation.target_table, &conditions, options)
            .await;
        self.related_rows(result, &relation.name)
    }

    fn related_rows(
        &self,
        result: OrmResult<Vec<Row>>,
        relation_name: &str,
    ) -> OrmResult<Vec<Row>> {
        match result {
            Ok(rows) => Ok(rows),
            Err(err) => {
                debug!(relation = relation_name, "relation lookup failed");
                self.log_recovered("find_related", &err);
                Ok(Vec::new())
            }
        }
    }
}
