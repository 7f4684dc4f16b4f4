//! Sequencing-group lifecycle
//!
//! A sequencing group is an immutable-membership grouping of assays of one
//! type/technology/platform under one sample; it is the unit analyses
//! attach to, so its identity must be stable for as long as its membership
//! is.
//!
//! ## Invariants
//!
//! - Once assigned an id, a group's member set never changes
//! - A membership change archives the current row and creates a successor
//!   linked via `derived_from_id`; archived rows are retained, never
//!   deleted
//! - At most one active (non-archived) group exists per
//!   `(sample_id, type, technology, platform)` key; the storage layer
//!   enforces this with a unique index over active rows
//! - The archive+create pair is one transaction; no reader observes a key
//!   with zero active rows, and no abort leaves an archived row without a
//!   successor

mod errors;
mod manager;
mod model;

pub use errors::{SeqGroupError, SeqGroupResult};
pub use manager::SequencingGroupManager;
pub use model::{
    AssayId, MemberAssay, SampleId, SequencingGroup, SequencingGroupId, SequencingGroupUpsert,
};
