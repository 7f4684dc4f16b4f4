//! Typed filter expressions and SQL compilation
//!
//! Every entity layer queries storage through a [`FilterModel`]: an ordered
//! set of named field bindings over a statically declared field schema,
//! compiled once per request into a `WHERE` clause plus named bound
//! parameters.
//!
//! # Design Principles
//!
//! - Caller-supplied values are bound, never interpolated
//! - Field schemas are declared at definition time; compilation never
//!   inspects runtime object shape
//! - Parameter names are deterministic for a given model
//! - Operand shape is validated at construction, not at execution

mod compiler;
mod errors;
mod expression;
mod model;

pub use compiler::{compile, CompiledFilter};
pub use errors::{FilterError, FilterResult};
pub use expression::{ErasedFilter, FilterExpression};
pub use model::{field, FieldDef, FilterModel};
