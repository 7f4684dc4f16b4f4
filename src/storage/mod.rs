//! Storage executor boundary
//!
//! The engine never owns a database connection. Every query crosses this
//! boundary as a SQL string plus a map of named bound parameters; the
//! executor on the other side is request-scoped and carries the caller's
//! transaction.
//!
//! # Design Principles
//!
//! - Caller-supplied values are never concatenated into query text
//! - Only storage I/O suspends; everything above this boundary is pure
//! - One executor = one logical request = one transaction scope

mod errors;
mod executor;
mod recording;

pub use errors::{StorageError, StorageResult};
pub use executor::{BoundParams, BoxFuture, QueryExecutor, Row};
pub use recording::{CallKind, RecordedCall, RecordingExecutor, ScriptedResponse};
