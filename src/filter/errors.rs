//! # Filter Errors
//!
//! Validation errors raised while building or compiling filter models.
//! These are always caller mistakes; they are surfaced immediately and
//! never retried.

use thiserror::Error;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter construction and compilation errors
#[derive(Debug, Error)]
pub enum FilterError {
    // ==================
    // Model shape
    // ==================
    /// Bound field name is not declared in the model's schema
    #[error("unknown filter field '{field}'")]
    UnknownField { field: String },

    /// Override key does not name a declared field
    #[error("unknown override field '{field}'")]
    UnknownOverride { field: String },

    // ==================
    // Operand shape
    // ==================
    /// `in`/`nin` was given a non-list operand
    #[error("operator '{operator}' on field '{field}' requires a list operand")]
    NonListOperand { field: String, operator: &'static str },

    /// A one-element list was bound where a scalar was intended
    /// (the trailing-comma footgun); rejected rather than silently
    /// filtering on an unintended sequence
    #[error(
        "operator '{operator}' on field '{field}' got a single-element list \
         where a scalar was expected"
    )]
    AmbiguousOperand { field: String, operator: &'static str },

    /// A list was bound to a scalar operator
    #[error("operator '{operator}' on field '{field}' requires a scalar operand")]
    NonScalarOperand { field: String, operator: &'static str },

    /// `contains`/`startswith` require a string operand
    #[error("operator '{operator}' on field '{field}' requires a string operand")]
    NonStringPattern { field: String, operator: &'static str },

    /// Meta subkey contains a quote character; rejected outright to keep
    /// JSON path construction static
    #[error("illegal meta subkey {key:?}")]
    IllegalMetaKey { key: String },

    // ==================
    // Internal
    // ==================
    /// An operand failed to serialize to a bindable value
    #[error("operand on field '{field}' is not bindable: {source}")]
    UnbindableOperand {
        field: String,
        #[source]
        source: serde_json::Error,
    },
}
