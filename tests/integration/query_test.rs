//! Query execution integration tests.
//!
//! Tests classification, parameter binding and result handling.

use super::{live_warden, unique_name, DRIVERS};
use redshift_warden::db::{MockDriver, Value};
use redshift_warden::safety::READ_ONLY_DENYLIST;
use redshift_warden::{AccessMode, Warden, WardenError};

async fn mock_warden(driver: &MockDriver, mode: AccessMode) -> Warden {
    let mut warden = Warden::new(Box::new(driver.clone()), mode);
    let (ok, message) = warden.connect("mock", "dev", "u", "p", None).await;
    assert!(ok, "{message}");
    warden
}

#[tokio::test]
async fn test_denylisted_verbs_only_blocked_in_read_only() {
    for mode in [AccessMode::ReadOnly, AccessMode::ReadWrite, AccessMode::Admin] {
        let driver = MockDriver::new();
        let mut warden = mock_warden(&driver, mode).await;

        for verb in READ_ONLY_DENYLIST {
            let sql = format!("{} something", verb.to_uppercase());
            let result = warden.execute_query(&sql, &[]).await;

            if mode == AccessMode::ReadOnly {
                let err = result.unwrap_err();
                assert!(matches!(err, WardenError::Forbidden { .. }), "{sql}");
                assert!(err.to_string().contains(&verb.to_uppercase()));
            } else {
                assert!(result.is_ok(), "{sql} under {mode}");
            }
        }

        let expected = if mode == AccessMode::ReadOnly {
            0
        } else {
            READ_ONLY_DENYLIST.len()
        };
        assert_eq!(driver.counters().executes(), expected);
    }
}

#[tokio::test]
async fn test_other_verbs_allowed_in_every_mode() {
    for mode in [AccessMode::ReadOnly, AccessMode::ReadWrite, AccessMode::Admin] {
        let driver = MockDriver::new();
        let mut warden = mock_warden(&driver, mode).await;

        for sql in [
            "SELECT * FROM users",
            "with t as (select 1) select * from t",
            "EXPLAIN SELECT 1",
            "show search_path",
        ] {
            assert!(warden.execute_query(sql, &[]).await.is_ok(), "{sql}");
        }
    }
}

#[tokio::test]
async fn test_execute_simple_select() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = warden
            .execute_query("SELECT 1 AS num, 'hello' AS greeting", &[])
            .await
            .unwrap();

        assert_eq!(result.column_names(), vec!["num", "greeting"]);
        assert_eq!(result.rows, vec![vec![Value::Int(1), Value::from("hello")]]);
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_bound_parameters() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = warden
            .execute_query(
                "SELECT $1::int8 + 1 AS next, $2::text AS quoted, $3::text IS NULL AS missing",
                &[Value::Int(41), Value::from("o'brien"), Value::Null],
            )
            .await
            .unwrap();

        assert_eq!(
            result.rows[0],
            vec![Value::Int(42), Value::from("o'brien"), Value::Bool(true)]
        );
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_query_error_keeps_connection() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let err = warden
            .execute_query("SELECT * FROM nonexistent_table_xyz", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::QueryFailed(_)));
        assert!(err.to_string().starts_with("Query failed: "));
        assert!(warden.is_connected());

        let result = warden.execute_query("SELECT 1", &[]).await.unwrap();
        assert_eq!(result.row_count, 1);
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_failed_statement_inside_transaction_is_recovered() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadWrite).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        warden.execute_query("BEGIN", &[]).await.unwrap();
        assert!(warden.execute_query("SELECT 1/0", &[]).await.is_err());

        // The aborted transaction was rolled back, so this is not rejected.
        let result = warden.execute_query("SELECT 2", &[]).await.unwrap();
        assert_eq!(result.rows, vec![vec![Value::Int(2)]]);
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_statement_without_result_set() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::Admin).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };
        let table = unique_name("warden_tmp");

        let created = warden
            .execute_query(&format!("CREATE TEMP TABLE {table} (id int)"), &[])
            .await
            .unwrap();
        assert!(created.columns.is_empty());
        assert!(created.rows.is_empty());

        warden
            .execute_query(&format!("INSERT INTO {table} VALUES ($1)"), &[Value::Int(7)])
            .await
            .unwrap();

        let empty = warden
            .execute_query(&format!("SELECT id FROM {table} WHERE id > 100"), &[])
            .await
            .unwrap();
        assert_eq!(empty.column_names(), vec!["id"]);
        assert!(empty.is_empty());

        warden
            .execute_query(&format!("DROP TABLE {table}"), &[])
            .await
            .unwrap();
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_read_only_blocks_before_server() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let err = warden
            .execute_query("CREATE TEMP TABLE should_not_exist (id int)", &[])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "'CREATE' statements are not allowed in read-only mode."
        );
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_backends_agree_on_parameter_types() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let after = warden
            .execute_query(
                "SELECT 1 AS hit WHERE current_date > $1",
                &[Value::from("2000-01-01")],
            )
            .await
            .unwrap();
        assert_eq!(after.rows, vec![vec![Value::Int(1)]], "{kind}");

        let equal = warden
            .execute_query("SELECT 5 = $1 AS same", &[Value::from("5")])
            .await
            .unwrap();
        assert_eq!(equal.rows, vec![vec![Value::Bool(true)]], "{kind}");

        let null = warden
            .execute_query("SELECT 5 = $1 AS same", &[Value::Null])
            .await
            .unwrap();
        assert_eq!(null.rows, vec![vec![Value::Null]], "{kind}");

        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_backends_agree_on_numeric_scale() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = warden
            .execute_query(
                "SELECT 0.10::numeric(12,2) AS price, $1::numeric(12,3) AS echoed",
                &[Value::Decimal("-42.125".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(
            result.rows,
            vec![vec![
                Value::Decimal("0.10".to_string()),
                Value::Decimal("-42.125".to_string())
            ]],
            "{kind}"
        );
        warden.disconnect().await;
    }
}
