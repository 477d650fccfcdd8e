//! Per-request query log.
//!
//! The toolbar middleware installs a fresh [`QueryLog`] around each request
//! with [`scope`]. Anything executed on that task through the recording
//! database extension lands in the log and is read back by the SQL panel.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use common::models::RecordedQuery;

tokio::task_local! {
    static QUERY_LOG: QueryLog;
}

/// Shared, append-only list of queries recorded during one request.
#[derive(Clone, Default)]
pub struct QueryLog {
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl QueryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query.
    pub fn push(&self, query: RecordedQuery) {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query);
    }

    /// Copies the recorded queries in execution order.
    pub fn snapshot(&self) -> Vec<RecordedQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded queries.
    pub fn len(&self) -> usize {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs `fut` with `log` installed as the current request's query log.
pub async fn scope<F: Future>(log: QueryLog, fut: F) -> F::Output {
    QUERY_LOG.scope(log, fut).await
}

/// Appends to the current request's log. Outside a scope this is a no-op.
pub fn record(query: RecordedQuery) {
    let _ = QUERY_LOG.try_with(|log| {
        tracing::debug!(
            statement = %query.statement,
            duration_ms = query.duration.as_secs_f64() * 1000.0,
            "query recorded"
        );
        log.push(query);
    });
}

/// Queries recorded so far in the current request. Empty outside a scope.
pub fn recorded_queries() -> Vec<RecordedQuery> {
    QUERY_LOG.try_with(QueryLog::snapshot).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::SqlParam;
    use std::time::Duration;

    fn query(sql: &str) -> RecordedQuery {
        RecordedQuery::new(sql, vec![SqlParam::Int(1)], Duration::from_millis(3), "src/lib.rs:1:1")
    }

    #[tokio::test]
    async fn test_records_in_order_inside_scope() {
        let log = QueryLog::new();
        let seen = scope(log.clone(), async {
            record(query("SELECT 1"));
            record(query("SELECT 2"));
            record(query("SELECT 3"));
            recorded_queries()
        })
        .await;

        let statements: Vec<_> = seen.iter().map(|q| q.statement.as_str()).collect();
        assert_eq!(statements, ["SELECT 1", "SELECT 2", "SELECT 3"]);
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_record_outside_scope_is_noop() {
        record(query("SELECT 1"));
        assert!(recorded_queries().is_empty());
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let first = QueryLog::new();
        let second = QueryLog::new();

        scope(first.clone(), async { record(query("SELECT a")) }).await;
        scope(second.clone(), async {
            record(query("SELECT b"));
            record(query("SELECT c"));
        })
        .await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }
}
