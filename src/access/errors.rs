//! # Access Errors
//!
//! A denial names every offending project and is never downgraded to a
//! not-found.

use thiserror::Error;

/// Result type for access operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Authorization errors
#[derive(Debug, Clone, Error)]
pub enum AccessError {
    /// Caller lacks the required role on the named projects (or the
    /// projects are unknown; existence is not leaked through denials)
    #[error("access denied to project(s): {}", .projects.join(", "))]
    Denied { projects: Vec<String> },

    /// No project scope was provided; the guard never infers
    /// "no project means unrestricted"
    #[error("no projects provided; access is fail-closed")]
    EmptyProjectSet,

    /// The membership backing store failed; propagated unmodified
    #[error("membership store error: {0}")]
    Store(String),
}
