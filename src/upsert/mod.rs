//! Nested upsert trees
//!
//! The nested-sample upsert shape arrives as a tree: a sample carrying
//! nested samples, assays, and sequencing-group payloads. [`flatten`]
//! linearizes it breadth-first so that inserting rows in emission order
//! never violates a parent-before-child foreign key.

mod errors;
mod flatten;
mod node;

pub use errors::{StructuralError, UpsertResult};
pub use flatten::{flatten, FlattenedNode};
pub use node::{NodeRef, UpsertNode};
