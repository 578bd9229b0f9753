//! Query execution seam.
//!
//! The engine never talks to a database itself. Whatever runs statements
//! implements [`QueryExecutor`]; the eager loader calls it once per batch
//! and logs each call's duration, flagging slow ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::query::QueryResult;
use crate::{Result, Row};

/// Runs rendered statements.
///
/// Implementations bind `query.parameter_values()` in order, or use
/// [`QueryResult::to_positional`] for drivers with `$n`/`?` placeholders.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Arc<E> {
    async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>> {
        (**self).fetch_all(query).await
    }
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>> {
        (**self).fetch_all(query).await
    }
}

/// Runs `query` through `executor` with completion logging.
#[instrument(skip(executor, query), fields(sql_preview = %query.sql().chars().take(100).collect::<String>()))]
pub(crate) async fn fetch_logged<E: QueryExecutor + ?Sized>(
    executor: &E,
    query: &QueryResult,
    slow_query_threshold_ms: u64,
) -> Result<Vec<Row>> {
    let start = Instant::now();
    match executor.fetch_all(query).await {
        Ok(rows) => {
            log_query_completion(query.sql(), start.elapsed(), rows.len(), slow_query_threshold_ms);
            Ok(rows)
        }
        Err(e) => {
            warn!(
                sql = %query.sql().chars().take(50).collect::<String>(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "Query failed"
            );
            Err(e)
        }
    }
}

fn log_query_completion(sql: &str, elapsed: Duration, row_count: usize, threshold_ms: u64) {
    let elapsed_ms = elapsed.as_millis() as u64;
    let sql_preview: String = sql.chars().take(100).collect();

    if elapsed_ms >= threshold_ms {
        warn!(
            sql = %sql_preview,
            elapsed_ms = elapsed_ms,
            threshold_ms = threshold_ms,
            row_count = row_count,
            "Slow query detected"
        );
    } else {
        debug!(
            sql = %sql_preview,
            elapsed_ms = elapsed_ms,
            row_count = row_count,
            "Query completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;
    use crate::{Dialect, QueryBuilder, SqlWeaveError};

    struct Failing;

    #[async_trait]
    impl QueryExecutor for Failing {
        async fn fetch_all(&self, _query: &QueryResult) -> Result<Vec<Row>> {
            Err(SqlWeaveError::Database("connection reset".to_string()))
        }
    }

    struct Fixed(Vec<Row>);

    #[async_trait]
    impl QueryExecutor for Fixed {
        async fn fetch_all(&self, _query: &QueryResult) -> Result<Vec<Row>> {
            Ok(self.0.clone())
        }
    }

    fn query() -> QueryResult {
        let users = Table::new("users", "User").shared();
        QueryBuilder::new(&users).unwrap().build(&Dialect::POSTGRES).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_logged_propagates_errors() {
        let err = fetch_logged(&Failing, &query(), 1000).await.unwrap_err();
        assert_eq!(err, SqlWeaveError::Database("connection reset".to_string()));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_arc_executor_delegates() {
        let executor: Arc<dyn QueryExecutor> = Arc::new(Fixed(vec![Row::from_pairs([("id", 1)])]));
        let rows = fetch_logged(&executor, &query(), 0).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
