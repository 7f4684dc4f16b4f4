//! Query executor trait
//!
//! The one outward dependency of the engine. Implementations wrap a real
//! connection pool; tests use [`super::RecordingExecutor`].

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::errors::StorageResult;

/// Boxed future returned by executor methods.
///
/// The engine targets no specific runtime; implementations decide how the
/// futures are driven.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One fetched row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Named bound parameters for one statement.
///
/// Ordered so that logged and recorded statements are deterministic. A
/// list-valued parameter (`Value::Array`) expands to a comma-separated
/// placeholder list at the driver; the engine never builds that text itself.
pub type BoundParams = BTreeMap<String, Value>;

/// Parameterized-query executor provided by the service shell.
///
/// All methods take SQL with `:name` placeholders and a [`BoundParams`] map.
/// Implementations must bind parameters through the driver; the engine
/// guarantees it never interpolates caller data into the SQL text, and the
/// executor must not either.
///
/// `begin`/`commit`/`rollback` scope a transaction on the request's
/// connection. The engine opens one transaction per atomic unit (e.g. one
/// sequencing-group archive+recreate pair) and never nests them.
pub trait QueryExecutor: Send + Sync {
    /// Fetch all matching rows.
    fn fetch_all<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<Vec<Row>>>;

    /// Fetch at most one row.
    fn fetch_one<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<Option<Row>>>;

    /// Fetch a single scalar value (first column of the first row).
    fn fetch_scalar<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<Option<Value>>>;

    /// Execute a statement, returning the number of affected rows.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<u64>>;

    /// Execute one statement once per parameter set.
    fn execute_many<'a>(
        &'a self,
        sql: &'a str,
        batches: &'a [BoundParams],
    ) -> BoxFuture<'a, StorageResult<()>>;

    /// Begin a transaction on this request's connection.
    fn begin(&self) -> BoxFuture<'_, StorageResult<()>>;

    /// Commit the open transaction.
    fn commit(&self) -> BoxFuture<'_, StorageResult<()>>;

    /// Roll back the open transaction.
    fn rollback(&self) -> BoxFuture<'_, StorageResult<()>>;
}
