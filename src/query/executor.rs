//! Query execution with safety classification.

use std::time::Instant;
use tracing::{debug, error, warn};

use crate::connection::ConnectionManager;
use crate::db::{QueryResult, Value};
use crate::error::{Result, WardenError};
use crate::safety::{classify, AccessMode, Verdict};

/// Classifies and executes statements on the active connection.
pub struct QueryExecutor<'a> {
    connection: &'a mut ConnectionManager,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor over `connection`.
    pub fn new(connection: &'a mut ConnectionManager) -> Self {
        Self { connection }
    }

    /// The access mode statements are classified under.
    pub fn mode(&self) -> AccessMode {
        self.connection.mode()
    }

    /// Executes `sql` with positional `params` and fetches every row.
    ///
    /// Fails with [`WardenError::NotConnected`] before anything else when no
    /// session is open, and with [`WardenError::Forbidden`] without touching
    /// the session when the access mode denies the statement. A driver error
    /// becomes [`WardenError::QueryFailed`]; the session is rolled back and
    /// stays open. A statement without a result set yields an empty result.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let mode = self.connection.mode();
        let Some((session, cursor)) = self.connection.active() else {
            return Err(WardenError::NotConnected);
        };

        if let Verdict::Denied { verb, reason } = classify(sql, mode) {
            warn!("{}", reason);
            return Err(WardenError::forbidden(&verb, mode));
        }

        debug!("Executing SQL ({} params): {}", params.len(), sql);
        let start = Instant::now();

        if let Err(e) = cursor.execute(session, sql, params).await {
            let e = into_query_failed(e);
            error!("{}", e);
            if let Err(rollback_err) = session.rollback().await {
                warn!("Rollback after failed statement failed: {}", rollback_err);
            }
            return Err(e);
        }

        let columns = cursor.description().map(<[_]>::to_vec).unwrap_or_default();
        let rows = cursor.fetch_all();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }
}

fn into_query_failed(e: WardenError) -> WardenError {
    if matches!(e, WardenError::QueryFailed(_)) {
        e
    } else {
        WardenError::query(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, Fetched, MockDriver};

    async fn connected(driver: &MockDriver, mode: AccessMode) -> ConnectionManager {
        let mut manager = ConnectionManager::new(Box::new(driver.clone()), mode);
        manager
            .connect("mock", "dev", "tester", "secret", 5439)
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn test_not_connected_never_reaches_driver() {
        let driver = MockDriver::new();
        let mut manager = ConnectionManager::new(Box::new(driver.clone()), AccessMode::Admin);

        let err = QueryExecutor::new(&mut manager)
            .execute("SELECT 1", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, WardenError::NotConnected));
        assert_eq!(driver.counters().executes(), 0);
    }

    #[tokio::test]
    async fn test_not_connected_wins_over_forbidden() {
        let driver = MockDriver::new();
        let mut manager = ConnectionManager::new(Box::new(driver), AccessMode::ReadOnly);

        let err = QueryExecutor::new(&mut manager)
            .execute("DROP TABLE users", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::NotConnected));
    }

    #[tokio::test]
    async fn test_select_one() {
        let driver = MockDriver::new();
        let mut manager = connected(&driver, AccessMode::ReadOnly).await;

        let result = QueryExecutor::new(&mut manager)
            .execute("SELECT 1", &[])
            .await
            .unwrap();

        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
        assert_eq!(result.row_count, 1);
    }

    #[tokio::test]
    async fn test_forbidden_in_read_only_is_not_executed() {
        let driver = MockDriver::new();
        let mut manager = connected(&driver, AccessMode::ReadOnly).await;

        let err = QueryExecutor::new(&mut manager)
            .execute("DROP TABLE users", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, WardenError::Forbidden { .. }));
        assert!(err.to_string().contains("DROP"));
        assert_eq!(driver.counters().executes(), 0);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_admin_executes_drop() {
        let driver = MockDriver::new();
        let mut manager = connected(&driver, AccessMode::Admin).await;

        let result = QueryExecutor::new(&mut manager)
            .execute("DROP TABLE users", &[])
            .await
            .unwrap();

        assert_eq!(driver.counters().executes(), 1);
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn test_params_are_passed_to_driver() {
        let driver = MockDriver::new();
        let mut manager = connected(&driver, AccessMode::ReadOnly).await;

        QueryExecutor::new(&mut manager)
            .execute(
                "SELECT * FROM users WHERE email = $1",
                &[Value::from("o'brien@example.com")],
            )
            .await
            .unwrap();

        let executed = driver.executed();
        let (sql, params) = executed.last().unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE email = $1");
        assert_eq!(params, &vec![Value::from("o'brien@example.com")]);
    }

    #[tokio::test]
    async fn test_empty_result_set_keeps_columns() {
        let driver = MockDriver::new();
        driver.respond(
            "where false",
            Fetched::rows(vec![ColumnInfo::new("id", "int4")], vec![]),
        );
        let mut manager = connected(&driver, AccessMode::ReadOnly).await;

        let result = QueryExecutor::new(&mut manager)
            .execute("SELECT id FROM users WHERE false", &[])
            .await
            .unwrap();

        assert_eq!(result.column_names(), vec!["id"]);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_rolls_back_and_stays_connected() {
        let driver = MockDriver::new();
        driver.fail_query("userz", "relation \"userz\" does not exist");
        let mut manager = connected(&driver, AccessMode::ReadOnly).await;

        let err = QueryExecutor::new(&mut manager)
            .execute("SELECT * FROM userz", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Query failed: relation \"userz\" does not exist"
        );
        assert_eq!(driver.counters().rollbacks(), 1);
        assert!(manager.is_connected());

        let result = QueryExecutor::new(&mut manager)
            .execute("SELECT 1", &[])
            .await
            .unwrap();
        assert_eq!(result.row_count, 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_error() {
        let driver = MockDriver::new();
        driver.fail_query("userz", "relation \"userz\" does not exist");
        driver.fail_rollback("no connection to the server");
        let mut manager = connected(&driver, AccessMode::ReadOnly).await;

        let err = QueryExecutor::new(&mut manager)
            .execute("SELECT * FROM userz", &[])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("userz"));
        assert!(manager.is_connected());
    }
}
