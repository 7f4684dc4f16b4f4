//! Recording executor for tests
//!
//! Records every call crossing the executor boundary and replays scripted
//! responses in order. Lets tests assert both what was asked of storage and
//! that nothing was asked at all (e.g. after an access denial).

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use super::errors::{StorageError, StorageResult};
use super::executor::{BoundParams, BoxFuture, QueryExecutor, Row};

/// Kind of call received by the recording executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    FetchAll,
    FetchOne,
    FetchScalar,
    Execute,
    ExecuteMany,
    Begin,
    Commit,
    Rollback,
}

/// One recorded executor call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<BoundParams>,
}

/// Scripted response popped by the next data-carrying call
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Rows(Vec<Row>),
    Row(Option<Row>),
    Scalar(Option<Value>),
    Affected(u64),
    Done,
    Fail(StorageError),
}

/// Test double implementing [`QueryExecutor`].
///
/// Transaction calls (`begin`/`commit`/`rollback`) are recorded but always
/// succeed; data calls pop the next scripted response. A missing or
/// mismatched script entry fails the call loudly so a test never passes on
/// accident.
#[derive(Default)]
pub struct RecordingExecutor {
    script: Mutex<VecDeque<ScriptedResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `fetch_all`.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.push(ScriptedResponse::Rows(rows));
    }

    /// Queue a response for the next `fetch_one`.
    pub fn push_row(&self, row: Option<Row>) {
        self.push(ScriptedResponse::Row(row));
    }

    /// Queue a response for the next `fetch_scalar`.
    pub fn push_scalar(&self, value: Option<Value>) {
        self.push(ScriptedResponse::Scalar(value));
    }

    /// Queue an affected-row count for the next `execute`.
    pub fn push_affected(&self, rows: u64) {
        self.push(ScriptedResponse::Affected(rows));
    }

    /// Queue a completion for the next `execute_many`.
    pub fn push_done(&self) {
        self.push(ScriptedResponse::Done);
    }

    /// Queue a failure for the next data-carrying call.
    pub fn push_error(&self, err: StorageError) {
        self.push(ScriptedResponse::Fail(err));
    }

    fn push(&self, response: ScriptedResponse) {
        self.lock_script().push_back(response);
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    /// Number of calls recorded so far.
    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<ScriptedResponse>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, kind: CallKind, sql: &str, params: Vec<BoundParams>) {
        self.lock_calls().push(RecordedCall {
            kind,
            sql: sql.to_string(),
            params,
        });
    }

    fn next_response(&self, kind: CallKind) -> StorageResult<ScriptedResponse> {
        match self.lock_script().pop_front() {
            Some(ScriptedResponse::Fail(err)) => Err(err),
            Some(response) => Ok(response),
            None => Err(StorageError::Backend(format!(
                "recording executor: no scripted response for {kind:?}"
            ))),
        }
    }
}

impl QueryExecutor for RecordingExecutor {
    fn fetch_all<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<Vec<Row>>> {
        self.record(CallKind::FetchAll, sql, vec![params.clone()]);
        let result = self.next_response(CallKind::FetchAll).and_then(|r| match r {
            ScriptedResponse::Rows(rows) => Ok(rows),
            other => Err(StorageError::Backend(format!(
                "recording executor: fetch_all got mismatched script entry {other:?}"
            ))),
        });
        Box::pin(async move { result })
    }

    fn fetch_one<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<Option<Row>>> {
        self.record(CallKind::FetchOne, sql, vec![params.clone()]);
        let result = self.next_response(CallKind::FetchOne).and_then(|r| match r {
            ScriptedResponse::Row(row) => Ok(row),
            other => Err(StorageError::Backend(format!(
                "recording executor: fetch_one got mismatched script entry {other:?}"
            ))),
        });
        Box::pin(async move { result })
    }

    fn fetch_scalar<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<Option<Value>>> {
        self.record(CallKind::FetchScalar, sql, vec![params.clone()]);
        let result = self
            .next_response(CallKind::FetchScalar)
            .and_then(|r| match r {
                ScriptedResponse::Scalar(value) => Ok(value),
                other => Err(StorageError::Backend(format!(
                    "recording executor: fetch_scalar got mismatched script entry {other:?}"
                ))),
            });
        Box::pin(async move { result })
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a BoundParams,
    ) -> BoxFuture<'a, StorageResult<u64>> {
        self.record(CallKind::Execute, sql, vec![params.clone()]);
        let result = self.next_response(CallKind::Execute).and_then(|r| match r {
            ScriptedResponse::Affected(rows) => Ok(rows),
            other => Err(StorageError::Backend(format!(
                "recording executor: execute got mismatched script entry {other:?}"
            ))),
        });
        Box::pin(async move { result })
    }

    fn execute_many<'a>(
        &'a self,
        sql: &'a str,
        batches: &'a [BoundParams],
    ) -> BoxFuture<'a, StorageResult<()>> {
        self.record(CallKind::ExecuteMany, sql, batches.to_vec());
        let result = self
            .next_response(CallKind::ExecuteMany)
            .and_then(|r| match r {
                ScriptedResponse::Done => Ok(()),
                other => Err(StorageError::Backend(format!(
                    "recording executor: execute_many got mismatched script entry {other:?}"
                ))),
            });
        Box::pin(async move { result })
    }

    fn begin(&self) -> BoxFuture<'_, StorageResult<()>> {
        self.record(CallKind::Begin, "BEGIN", Vec::new());
        Box::pin(async { Ok(()) })
    }

    fn commit(&self) -> BoxFuture<'_, StorageResult<()>> {
        self.record(CallKind::Commit, "COMMIT", Vec::new());
        Box::pin(async { Ok(()) })
    }

    fn rollback(&self) -> BoxFuture<'_, StorageResult<()>> {
        self.record(CallKind::Rollback, "ROLLBACK", Vec::new());
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_replays_scripted_responses_in_order() {
        let executor = RecordingExecutor::new();
        executor.push_rows(vec![row(&[("id", json!(1))])]);
        executor.push_affected(1);

        let params = BoundParams::new();
        let rows = executor.fetch_all("SELECT 1", &params).await.unwrap();
        assert_eq!(rows.len(), 1);

        let affected = executor.execute("UPDATE t SET x = :x", &params).await.unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_records_sql_and_params() {
        let executor = RecordingExecutor::new();
        executor.push_rows(Vec::new());

        let mut params = BoundParams::new();
        params.insert("id_eq".to_string(), json!(42));
        executor
            .fetch_all("SELECT id FROM assay WHERE id = :id_eq", &params)
            .await
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, CallKind::FetchAll);
        assert!(calls[0].sql.contains(":id_eq"));
        assert_eq!(calls[0].params[0]["id_eq"], json!(42));
    }

    #[tokio::test]
    async fn test_missing_script_entry_fails_loudly() {
        let executor = RecordingExecutor::new();
        let params = BoundParams::new();
        let result = executor.fetch_one("SELECT 1", &params).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn test_scripted_failure_surfaces() {
        let executor = RecordingExecutor::new();
        executor.push_error(StorageError::ConstraintViolation("uq".to_string()));

        let params = BoundParams::new();
        let result = executor.execute("INSERT ...", &params).await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }
}
