//! # Sequencing-Group Errors
//!
//! Validation errors are raised before any row is touched; not-found and
//! conflict errors abort the batch at the failing group.

use thiserror::Error;

use crate::access::AccessError;
use crate::filter::FilterError;
use crate::storage::StorageError;

use super::model::{AssayId, SequencingGroupId};

/// Result type for sequencing-group operations
pub type SeqGroupResult<T> = Result<T, SeqGroupError>;

/// Sequencing-group lifecycle errors
#[derive(Debug, Error)]
pub enum SeqGroupError {
    /// A submitted group has no member assays at all
    #[error("sequencing group at batch index {index} has no member assays")]
    EmptyMembers { index: usize },

    /// Referenced member assays do not exist; distinct from a denial
    #[error(
        "assay(s) not found: {}",
        .ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    AssayNotFound { ids: Vec<AssayId> },

    /// A submitted group id does not exist
    #[error("sequencing group not found: {id}")]
    GroupNotFound { id: SequencingGroupId },

    /// Another writer archived this group between the membership diff and
    /// the archive write; the caller must re-read and retry
    #[error("sequencing group {id} was modified concurrently")]
    ConcurrentModification { id: SequencingGroupId },

    /// Caller lacks the required role on the owning project
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Filter construction failed while building a batched fetch
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Storage failure, propagated unmodified
    #[error(transparent)]
    Storage(#[from] StorageError),
}
