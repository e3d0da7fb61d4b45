//! CRUD operations
//!
//! Read and convenience-write paths recover storage failures locally: the
//! error is logged and a benign empty/zero/false value is returned, so a
//! failed call is indistinguishable from a legitimate empty result.
//! `create`, `bulk_create`, and `save` propagate errors.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::adapter::Row;
use crate::error::OrmResult;
use crate::mapping::Record;
use crate::query::{Conditions, QueryOptions};

use super::EntityDao;

impl<T, K> EntityDao<T, K>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    K: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// All entities, subject to `options`
    pub async fn find_all(&self, options: &QueryOptions) -> Vec<T> {
        self.find_by(&Conditions::new(), options).await
    }

    /// Entities matching `conditions` (logical names), subject to
    /// `options`
    pub async fn find_by(&self, conditions: &Conditions, options: &QueryOptions) -> Vec<T> {
        let (physical_options, joins) = match self.physical_options(options) {
            Ok(expanded) => expanded,
            Err(err) => {
                error!(
                    entity = %self.mapping().entity_name,
                    error = %err,
                    "find_by option expansion failed, recovered as empty result"
                );
                return Vec::new();
            }
        };
        let physical_conditions = self.physical_conditions(conditions);

        let result = if joins.is_empty() {
            if physical_conditions.is_empty() {
                self.adapter()
                    .find_all(self.table(), &physical_options)
                    .await
            } else {
                self.adapter()
                    .find_by(self.table(), &physical_conditions, &physical_options)
                    .await
            }
        } else {
            self.adapter()
                .find_with_join(self.table(), &joins, &physical_conditions, &physical_options)
                .await
        };

        self.collect_rows(result, "find_by")
    }

    /// First entity matching `conditions`, or `None`
    pub async fn find_one_by(
        &self,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> Option<T> {
        let (physical_options, joins) = match self.physical_options(options) {
            Ok(expanded) => expanded,
            Err(err) => {
                error!(
                    entity = %self.mapping().entity_name,
                    error = %err,
                    "find_one_by option expansion failed, recovered as none"
                );
                return None;
            }
        };
        let physical_conditions = self.physical_conditions(conditions);

        if joins.is_empty() {
            match self
                .adapter()
                .find_one_by(self.table(), &physical_conditions, &physical_options)
                .await
            {
                Ok(row) => row.and_then(|row| self.entity_or_log(&row, "find_one_by")),
                Err(err) => {
                    self.log_recovered("find_one_by", &err);
                    None
                }
            }
        } else {
            let result = self
                .adapter()
                .find_with_join(self.table(), &joins, &physical_conditions, &physical_options)
                .await;
            self.collect_rows(result, "find_one_by").into_iter().next()
        }
    }

    /// Entity with the given identifier, or `None`. A storage failure is
    /// indistinguishable from a missing row on this path.
    pub async fn find_by_id(&self, id: &K, options: &QueryOptions) -> Option<T> {
        let (pk, id_value) = match self.pk_and_id(id) {
            Ok(pair) => pair,
            Err(err) => {
                self.log_recovered("find_by_id", &err);
                return None;
            }
        };

        if options.select.is_empty()
            && options.relations.is_empty()
            && options.order_by.is_empty()
            && options.limit.is_none()
            && options.offset.is_none()
        {
            match self.adapter().find_by_id(self.table(), &pk, &id_value).await {
                Ok(row) => row.and_then(|row| self.entity_or_log(&row, "find_by_id")),
                Err(err) => {
                    self.log_recovered("find_by_id", &err);
                    None
                }
            }
        } else {
            let conditions = Conditions::new().eq(self.mapping().id_field.clone(), id_value);
            self.find_one_by(&conditions, options).await
        }
    }

    /// Count of rows matching `conditions`; `0` on storage failure
    pub async fn count(&self, conditions: &Conditions) -> u64 {
        let physical = self.physical_conditions(conditions);
        match self.adapter().count(self.table(), &physical).await {
            Ok(count) => count,
            Err(err) => {
                self.log_recovered("count", &err);
                0
            }
        }
    }

    /// Whether a row with the given identifier exists; `false` on storage
    /// failure
    pub async fn exists(&self, id: &K) -> bool {
        let (pk, id_value) = match self.pk_and_id(id) {
            Ok(pair) => pair,
            Err(err) => {
                self.log_recovered("exists", &err);
                return false;
            }
        };
        match self.adapter().exists(self.table(), &pk, &id_value).await {
            Ok(exists) => exists,
            Err(err) => {
                self.log_recovered("exists", &err);
                false
            }
        }
    }

    /// Insert a new entity and return its identifier.
    ///
    /// Applies configured timestamps, coerces boolean/date values for
    /// storage, strips a null auto-increment key, and translates to
    /// physical form. Errors propagate.
    pub async fn create(&self, entity: &T) -> OrmResult<K> {
        let record = self.entity_to_record(entity)?;
        let row = self.prepare_insert(record)?;
        debug!(entity = %self.mapping().entity_name, "creating entity");
        let id = self.adapter().insert(self.table(), row).await?;
        self.value_to_id(id)
    }

    /// Insert many entities through the same per-row pipeline as
    /// [`create`](EntityDao::create), as one batched insert. Partial
    /// failure semantics are whatever the adapter's bulk primitive
    /// provides.
    pub async fn bulk_create(&self, entities: &[T]) -> OrmResult<u64> {
        let mut rows = Vec::with_capacity(entities.len());
        for entity in entities {
            let record = self.entity_to_record(entity)?;
            rows.push(self.prepare_insert(record)?);
        }
        if rows.is_empty() {
            return Ok(0);
        }
        debug!(
            entity = %self.mapping().entity_name,
            count = rows.len(),
            "bulk creating entities"
        );
        self.adapter().bulk_insert(self.table(), rows).await
    }

    /// Update the row with the given identifier using a partial logical
    /// record. Returns the affected row count; `0` on storage failure.
    /// The primary key field is never written through this path.
    pub async fn update(&self, id: &K, changes: Record) -> u64 {
        let (pk, id_value) = match self.pk_and_id(id) {
            Ok(pair) => pair,
            Err(err) => {
                self.log_recovered("update", &err);
                return 0;
            }
        };
        let row = self.prepare_update(changes);
        match self
            .adapter()
            .update(self.table(), &pk, &id_value, row)
            .await
        {
            Ok(affected) => affected,
            Err(err) => {
                self.log_recovered("update", &err);
                0
            }
        }
    }

    /// Update every row matching `conditions`. Returns the affected row
    /// count; `0` on storage failure.
    pub async fn update_by(&self, conditions: &Conditions, changes: Record) -> u64 {
        let physical_conditions = self.physical_conditions(conditions);
        let row = self.prepare_update(changes);
        match self
            .adapter()
            .update_by(self.table(), &physical_conditions, row)
            .await
        {
            Ok(affected) => affected,
            Err(err) => {
                self.log_recovered("update_by", &err);
                0
            }
        }
    }

    /// Upsert by identifier presence: update when the id field is present
    /// and non-null, create otherwise. Returns the identifier either way.
    pub async fn save(&self, entity: &T) -> OrmResult<K> {
        let record = self.entity_to_record(entity)?;
        match record.get(&self.mapping().id_field) {
            Some(value) if !value.is_null() => {
                let id: K = self.value_to_id(value.clone())?;
                self.update(&id, record).await;
                Ok(id)
            }
            _ => self.create(entity).await,
        }
    }

    /// Delete the row with the given identifier. When the mapping
    /// configures soft deletes this is rewritten into an update setting
    /// the soft-delete column; no physical removal is ever issued.
    /// Returns the affected row count; `0` on storage failure.
    pub async fn delete(&self, id: &K) -> u64 {
        if let Some(soft) = self.mapping().soft_delete.clone() {
            let mut changes = Record::new();
            changes.insert(soft.column, soft.deleted_value);
            return self.update(id, changes).await;
        }

        let (pk, id_value) = match self.pk_and_id(id) {
            Ok(pair) => pair,
            Err(err) => {
                self.log_recovered("delete", &err);
                return 0;
            }
        };
        match self.adapter().delete(self.table(), &pk, &id_value).await {
            Ok(affected) => affected,
            Err(err) => {
                self.log_recovered("delete", &err);
                0
            }
        }
    }

    /// Delete every row matching `conditions`, with the same soft-delete
    /// rewrite as [`delete`](EntityDao::delete)
    pub async fn delete_by(&self, conditions: &Conditions) -> u64 {
        if let Some(soft) = self.mapping().soft_delete.clone() {
            let mut changes = Record::new();
            changes.insert(soft.column, soft.deleted_value);
            return self.update_by(conditions, changes).await;
        }

        let physical = self.physical_conditions(conditions);
        match self.adapter().delete_by(self.table(), &physical).await {
            Ok(affected) => affected,
            Err(err) => {
                self.log_recovered("delete_by", &err);
                0
            }
        }
    }

    // ---- shared pipeline pieces -----------------------------------------

    fn prepare_insert(&self, mut record: Record) -> OrmResult<Row> {
        self.apply_create_timestamps(&mut record);
        self.coerce_record_for_storage(&mut record);

        let pk = self.mapping().primary_key_column()?;
        if pk.auto_increment {
            let absent_or_null = record.get(&pk.logical).map_or(true, Value::is_null);
            if absent_or_null {
                record.remove(&pk.logical);
            }
        }

        Ok(self.mapping().record_to_physical(&record))
    }

    fn prepare_update(&self, mut changes: Record) -> Row {
        changes.remove(&self.mapping().id_field);
        self.apply_update_timestamp(&mut changes);
        self.coerce_record_for_storage(&mut changes);
        self.mapping().record_to_physical(&changes)
    }

    fn pk_and_id(&self, id: &K) -> OrmResult<(String, Value)> {
        let pk = self.mapping().primary_key_column()?;
        Ok((pk.physical.clone(), self.id_to_value(id)?))
    }

    pub(crate) fn collect_rows(&self, result: OrmResult<Vec<Row>>, operation: &str) -> Vec<T> {
        match result {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| self.entity_or_log(row, operation))
                .collect(),
            Err(err) => {
                self.log_recovered(operation, &err);
                Vec::new()
            }
        }
    }

    fn entity_or_log(&self, row: &Row, operation: &str) -> Option<T> {
        match self.row_to_entity(row) {
            Ok(entity) => Some(entity),
            Err(err) => {
                error!(
                    entity = %self.mapping().entity_name,
                    operation,
                    error = %err,
                    "row deserialization failed, row skipped"
                );
                None
            }
        }
    }

    pub(crate) fn log_recovered(&self, operation: &str, err: &crate::error::OrmError) {
        error!(
            entity = %self.mapping().entity_name,
            operation,
            error = %err,
            "storage error recovered as empty result"
        );
    }
}
