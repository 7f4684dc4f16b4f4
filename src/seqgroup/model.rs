//! Sequencing-group data model

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Sequencing-group row identifier
pub type SequencingGroupId = Uuid;
/// Assay row identifier
pub type AssayId = Uuid;
/// Sample row identifier
pub type SampleId = Uuid;

/// A stored sequencing-group row.
///
/// `group_type`, `technology`, and `platform` together with `sample_id`
/// form the logical key; `derived_from_id` links a row to the archived
/// predecessor it replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencingGroup {
    pub id: SequencingGroupId,
    pub sample_id: SampleId,
    pub group_type: String,
    pub technology: String,
    pub platform: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub archived: bool,
    #[serde(default)]
    pub derived_from_id: Option<SequencingGroupId>,
}

/// One member assay reference in an upsert.
///
/// `newly_created` marks assays that were inserted earlier in the same
/// batch; a group referencing one cannot match any stored membership and
/// always takes the recreate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberAssay {
    pub id: AssayId,
    pub newly_created: bool,
}

impl MemberAssay {
    /// A member that already existed before this batch.
    pub fn existing(id: AssayId) -> Self {
        Self {
            id,
            newly_created: false,
        }
    }

    /// A member created earlier in this batch.
    pub fn created(id: AssayId) -> Self {
        Self {
            id,
            newly_created: true,
        }
    }
}

/// One submitted group in an upsert batch.
///
/// `id = None` requests a new group; `id = Some` patches or recreates the
/// stored group depending on the membership diff.
#[derive(Debug, Clone)]
pub struct SequencingGroupUpsert {
    pub id: Option<SequencingGroupId>,
    pub sample_id: SampleId,
    pub group_type: String,
    pub technology: String,
    pub platform: String,
    pub meta: Map<String, Value>,
    pub members: Vec<MemberAssay>,
}

impl SequencingGroupUpsert {
    /// The requested member set.
    pub fn member_ids(&self) -> BTreeSet<AssayId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// True if any member was created in this batch.
    pub fn has_pending_members(&self) -> bool {
        self.members.iter().any(|m| m.newly_created)
    }
}

/// Merges stored and requested meta; requested keys win.
pub(crate) fn merge_meta(current: &Map<String, Value>, requested: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = current.clone();
    for (key, value) in requested {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
