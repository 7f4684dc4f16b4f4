//! Sequencing-group upsert algorithm
//!
//! Splits a batch into new / pending-members / existing-resolved groups,
//! diffs requested membership against stored membership in batched
//! queries, then patches in place or archives-and-recreates per group
//! inside that group's own transaction.
//!
//! The archive write carries an `archived = FALSE` guard and the affected
//! row count is checked in the same transaction: a concurrent writer that
//! already archived the row surfaces as a conflict instead of silently
//! losing its membership change.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use crate::access::{AccessGuard, AuthContext, ProjectId, Role};
use crate::filter::{compile, field, FieldDef, FilterExpression, FilterModel};
use crate::observability::Logger;
use crate::storage::{BoundParams, QueryExecutor, Row, StorageError};

use super::errors::{SeqGroupError, SeqGroupResult};
use super::model::{
    merge_meta, AssayId, SequencingGroup, SequencingGroupId, SequencingGroupUpsert,
};

const ASSAY_FIELDS: &[FieldDef] = &[field("id", "a.id")];

const SEQGROUP_FIELDS: &[FieldDef] = &[field("id", "sg.id")];

const LINK_FIELDS: &[FieldDef] = &[field(
    "sequencing_group_id",
    "sga.sequencing_group_id",
)];

const SQL_INSERT_GROUP: &str = "INSERT INTO sequencing_group \
     (id, sample_id, group_type, technology, platform, meta, archived, derived_from_id) \
     VALUES (:id, :sample_id, :group_type, :technology, :platform, :meta, FALSE, :derived_from_id)";

const SQL_INSERT_LINK: &str = "INSERT INTO sequencing_group_assay \
     (sequencing_group_id, assay_id) VALUES (:sequencing_group_id, :assay_id)";

const SQL_PATCH_GROUP: &str =
    "UPDATE sequencing_group SET platform = :platform, meta = :meta WHERE id = :id";

const SQL_ARCHIVE_GROUP: &str =
    "UPDATE sequencing_group SET archived = TRUE WHERE id = :id AND archived = FALSE";

/// Runs sequencing-group upsert batches against the storage executor,
/// authorizing through the access guard first.
pub struct SequencingGroupManager<'a> {
    executor: &'a dyn QueryExecutor,
    guard: &'a AccessGuard,
}

impl<'a> SequencingGroupManager<'a> {
    pub fn new(executor: &'a dyn QueryExecutor, guard: &'a AccessGuard) -> Self {
        Self { executor, guard }
    }

    /// Upserts a batch of sequencing groups, returning the active id of
    /// each submitted group in batch order.
    ///
    /// Validation (empty member lists, missing assays, unknown group ids)
    /// completes before any write. Each group's mutation then runs in its
    /// own transaction; the first failure aborts the remainder of the
    /// batch while already-committed groups stay committed.
    pub async fn upsert_sequencing_groups(
        &self,
        ctx: &AuthContext,
        project: ProjectId,
        batch: &[SequencingGroupUpsert],
    ) -> SeqGroupResult<Vec<SequencingGroupId>> {
        self.guard
            .assert_access(ctx, &[project], Role::Writer)
            .await?;

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        for (index, group) in batch.iter().enumerate() {
            if group.members.is_empty() {
                return Err(SeqGroupError::EmptyMembers { index });
            }
        }

        let all_members: BTreeSet<AssayId> = batch
            .iter()
            .flat_map(SequencingGroupUpsert::member_ids)
            .collect();
        self.assert_assays_exist(&all_members).await?;

        let submitted_ids: Vec<SequencingGroupId> =
            batch.iter().filter_map(|g| g.id).collect();
        let current_groups = self.fetch_groups(&submitted_ids).await?;
        for id in &submitted_ids {
            if !current_groups.contains_key(id) {
                return Err(SeqGroupError::GroupNotFound { id: *id });
            }
        }
        let current_members = self.fetch_current_members(&submitted_ids).await?;

        let mut result = Vec::with_capacity(batch.len());
        for group in batch {
            let id = match group.id {
                None => self.create(group).await?,
                Some(id) => {
                    let current = &current_groups[&id];
                    let stored = current_members.get(&id).cloned().unwrap_or_default();
                    if !group.has_pending_members() && group.member_ids() == stored {
                        self.patch(current, group).await?;
                        id
                    } else {
                        self.archive_and_recreate(current, group).await?
                    }
                }
            };
            result.push(id);
        }
        Ok(result)
    }

    /// Verifies every referenced assay exists, in one batched query.
    async fn assert_assays_exist(&self, ids: &BTreeSet<AssayId>) -> SeqGroupResult<()> {
        let model = FilterModel::new(ASSAY_FIELDS)
            .bind("id", FilterExpression::new().in_list(ids.iter().copied().collect()))?;
        let compiled = compile(&model, None)?;

        let sql = format!("SELECT a.id FROM assay a WHERE {}", compiled.sql);
        let rows = self.executor.fetch_all(&sql, &compiled.params).await?;

        let found: HashSet<AssayId> = rows
            .iter()
            .map(|row| row_uuid(row, "id"))
            .collect::<SeqGroupResult<_>>()?;
        let missing: Vec<AssayId> = ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(SeqGroupError::AssayNotFound { ids: missing });
        }
        Ok(())
    }

    /// Fetches the current rows for the submitted group ids in one query.
    async fn fetch_groups(
        &self,
        ids: &[SequencingGroupId],
    ) -> SeqGroupResult<HashMap<SequencingGroupId, SequencingGroup>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let model = FilterModel::new(SEQGROUP_FIELDS)
            .bind("id", FilterExpression::new().in_list(ids.to_vec()))?;
        let compiled = compile(&model, None)?;

        let sql = format!(
            "SELECT sg.id, sg.sample_id, sg.group_type, sg.technology, sg.platform, \
             sg.meta, sg.archived, sg.derived_from_id \
             FROM sequencing_group sg WHERE {}",
            compiled.sql
        );
        let rows = self.executor.fetch_all(&sql, &compiled.params).await?;

        let mut groups = HashMap::with_capacity(rows.len());
        for row in rows {
            let group: SequencingGroup = serde_json::from_value(Value::Object(row))
                .map_err(|e| StorageError::UnexpectedRow(e.to_string()))?;
            groups.insert(group.id, group);
        }
        Ok(groups)
    }

    /// Fetches current member-id sets for the submitted group ids in one
    /// query keyed by group id.
    async fn fetch_current_members(
        &self,
        ids: &[SequencingGroupId],
    ) -> SeqGroupResult<HashMap<SequencingGroupId, BTreeSet<AssayId>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let model = FilterModel::new(LINK_FIELDS).bind(
            "sequencing_group_id",
            FilterExpression::new().in_list(ids.to_vec()),
        )?;
        let compiled = compile(&model, None)?;

        let sql = format!(
            "SELECT sga.sequencing_group_id, sga.assay_id \
             FROM sequencing_group_assay sga WHERE {}",
            compiled.sql
        );
        let rows = self.executor.fetch_all(&sql, &compiled.params).await?;

        let mut members: HashMap<SequencingGroupId, BTreeSet<AssayId>> = HashMap::new();
        for row in &rows {
            let group_id = row_uuid(row, "sequencing_group_id")?;
            let assay_id = row_uuid(row, "assay_id")?;
            members.entry(group_id).or_default().insert(assay_id);
        }
        Ok(members)
    }

    /// Inserts a brand-new group and its membership links in one
    /// transaction.
    async fn create(&self, group: &SequencingGroupUpsert) -> SeqGroupResult<SequencingGroupId> {
        let id = Uuid::new_v4();
        self.executor.begin().await?;
        let result = self
            .insert_group_rows(
                id,
                group.sample_id,
                &group.group_type,
                &group.technology,
                &group.platform,
                Value::Object(group.meta.clone()),
                None,
                &group.member_ids(),
            )
            .await;
        match result {
            Ok(()) => {
                self.executor.commit().await?;
                Logger::info("seqgroup.created", &[("id", &id.to_string())]);
                Ok(id)
            }
            Err(err) => {
                let _ = self.executor.rollback().await;
                Err(err)
            }
        }
    }

    /// Applies an in-place patch of `meta`/`platform`; the id and the
    /// membership are untouched.
    async fn patch(
        &self,
        current: &SequencingGroup,
        group: &SequencingGroupUpsert,
    ) -> SeqGroupResult<()> {
        let merged = merge_meta(&current.meta, &group.meta);
        let mut params = BoundParams::new();
        params.insert("id".to_string(), Value::String(current.id.to_string()));
        params.insert("platform".to_string(), Value::String(group.platform.clone()));
        params.insert("meta".to_string(), Value::Object(merged));

        self.executor.begin().await?;
        let result = self.executor.execute(SQL_PATCH_GROUP, &params).await;
        match result {
            Ok(_) => {
                self.executor.commit().await?;
                Logger::info("seqgroup.patched", &[("id", &current.id.to_string())]);
                Ok(())
            }
            Err(err) => {
                let _ = self.executor.rollback().await;
                Err(err.into())
            }
        }
    }

    /// Archives the current row and inserts its successor in one
    /// transaction. The pair is the atomic unit of cancellation: on any
    /// failure the transaction rolls back, so no archived row is ever left
    /// without a successor.
    async fn archive_and_recreate(
        &self,
        current: &SequencingGroup,
        group: &SequencingGroupUpsert,
    ) -> SeqGroupResult<SequencingGroupId> {
        self.executor.begin().await?;
        let result = self.archive_and_recreate_in_tx(current, group).await;
        match result {
            Ok(new_id) => {
                self.executor.commit().await?;
                Logger::info(
                    "seqgroup.recreated",
                    &[
                        ("archived_id", &current.id.to_string()),
                        ("id", &new_id.to_string()),
                    ],
                );
                Ok(new_id)
            }
            Err(err) => {
                let _ = self.executor.rollback().await;
                Err(err)
            }
        }
    }

    async fn archive_and_recreate_in_tx(
        &self,
        current: &SequencingGroup,
        group: &SequencingGroupUpsert,
    ) -> SeqGroupResult<SequencingGroupId> {
        let mut params = BoundParams::new();
        params.insert("id".to_string(), Value::String(current.id.to_string()));
        let affected = self.executor.execute(SQL_ARCHIVE_GROUP, &params).await?;
        if affected == 0 {
            // Another writer archived this row after our membership diff.
            return Err(SeqGroupError::ConcurrentModification { id: current.id });
        }

        let new_id = Uuid::new_v4();
        let merged = merge_meta(&current.meta, &group.meta);
        // The successor keeps the immutable key fields of the row it
        // replaces; platform and meta follow the request, mirroring what
        // the in-place patch path may change.
        self.insert_group_rows(
            new_id,
            current.sample_id,
            &current.group_type,
            &current.technology,
            &group.platform,
            Value::Object(merged),
            Some(current.id),
            &group.member_ids(),
        )
        .await?;
        Ok(new_id)
    }

    /// Inserts a group row and its membership links. Group row first:
    /// the link table's foreign key requires it.
    #[allow(clippy::too_many_arguments)]
    async fn insert_group_rows(
        &self,
        id: SequencingGroupId,
        sample_id: Uuid,
        group_type: &str,
        technology: &str,
        platform: &str,
        meta: Value,
        derived_from: Option<SequencingGroupId>,
        members: &BTreeSet<AssayId>,
    ) -> SeqGroupResult<()> {
        let mut params = BoundParams::new();
        params.insert("id".to_string(), Value::String(id.to_string()));
        params.insert("sample_id".to_string(), Value::String(sample_id.to_string()));
        params.insert("group_type".to_string(), Value::String(group_type.to_string()));
        params.insert("technology".to_string(), Value::String(technology.to_string()));
        params.insert("platform".to_string(), Value::String(platform.to_string()));
        params.insert("meta".to_string(), meta);
        params.insert(
            "derived_from_id".to_string(),
            derived_from
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null),
        );
        self.executor.execute(SQL_INSERT_GROUP, &params).await?;

        let link_batches: Vec<BoundParams> = members
            .iter()
            .map(|assay_id| {
                let mut link = BoundParams::new();
                link.insert(
                    "sequencing_group_id".to_string(),
                    Value::String(id.to_string()),
                );
                link.insert("assay_id".to_string(), Value::String(assay_id.to_string()));
                link
            })
            .collect();
        self.executor.execute_many(SQL_INSERT_LINK, &link_batches).await?;
        Ok(())
    }
}

/// Decodes a UUID column from a fetched row.
fn row_uuid(row: &Row, key: &str) -> SeqGroupResult<Uuid> {
    row.get(key)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| {
            StorageError::UnexpectedRow(format!("missing or invalid uuid column '{key}'")).into()
        })
}
