//! Connection integration tests.
//!
//! Tests the session lifecycle and connection error handling.

use super::{live_warden, DRIVERS};
use redshift_warden::connection::ConnectionManager;
use redshift_warden::db::{ConnectParams, MockDriver};
use redshift_warden::{AccessMode, Warden, WardenError};
use std::time::Duration;

#[tokio::test]
async fn test_connect_and_disconnect() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let info = warden.connection_info();
        assert!(info.is_connected);
        assert_eq!(info.driver, kind.as_str());

        assert_eq!(
            warden.disconnect().await,
            (true, "Disconnected successfully".to_string())
        );
        assert!(!warden.is_connected());
    }
}

#[tokio::test]
async fn test_live_reconnect_replaces_session() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };
        let params = super::test_connect_params().unwrap();

        let (ok, message) = warden
            .connect(
                &params.host,
                &params.database,
                &params.user,
                &params.password,
                Some(params.port),
            )
            .await;
        assert!(ok, "{message}");

        let result = warden.execute_query("SELECT 1", &[]).await.unwrap();
        assert_eq!(result.row_count, 1);
        warden.disconnect().await;
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreachable_host_leaves_disconnected() {
    for kind in DRIVERS {
        let mut warden = Warden::new(kind.build(), AccessMode::ReadOnly);

        // Nothing listens on port 1.
        let (ok, message) = warden
            .connect("127.0.0.1", "dev", "analyst", "secret", Some(1))
            .await;

        assert!(!ok, "{kind} connected to port 1");
        assert!(message.starts_with("Connection failed: "), "{message}");
        assert!(!warden.is_connected());
        assert_eq!(warden.connection_info().host, None);
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_timeout_is_bounded() {
    for kind in DRIVERS {
        let driver = kind.build();
        // TEST-NET-1 is not routable, so the attempt can only time out or fail.
        let params = ConnectParams::new("192.0.2.1", 5439, "dev", "u", "p")
            .with_connect_timeout(Duration::from_millis(300));

        let started = std::time::Instant::now();
        let result = driver.open_session(&params).await;

        assert!(matches!(result, Err(WardenError::Connection(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

#[tokio::test]
async fn test_reconnect_closes_previous_session() {
    let driver = MockDriver::new();
    let mut manager = ConnectionManager::new(Box::new(driver.clone()), AccessMode::ReadOnly);

    for host in ["a", "b", "c"] {
        manager.connect(host, "dev", "u", "p", 5439).await.unwrap();
        assert_eq!(driver.counters().open_sessions(), 1);
    }

    assert_eq!(driver.counters().opens(), 3);
    assert_eq!(driver.counters().closes(), 2);
    assert_eq!(manager.connection_info().host.as_deref(), Some("c"));
}

#[tokio::test]
async fn test_state_is_consistent_after_every_operation() {
    let driver = MockDriver::new();
    let mut manager = ConnectionManager::new(Box::new(driver.clone()), AccessMode::ReadOnly);
    assert!(manager.state().is_consistent());

    manager.connect("a", "dev", "u", "p", 5439).await.unwrap();
    assert!(manager.state().is_consistent());

    driver.fail_connect("password authentication failed for user \"u\"");
    assert!(manager.connect("a", "dev", "u", "p", 5439).await.is_err());
    assert!(manager.state().is_consistent());
    assert!(!manager.is_connected());

    driver.clear_failures();
    manager.connect("a", "dev", "u", "p", 5439).await.unwrap();
    driver.fail_close("connection reset by peer");
    assert!(manager.disconnect().await.is_err());
    assert!(manager.state().is_consistent());
    assert!(!manager.is_connected());

    assert!(manager.disconnect().await.is_ok());
    assert!(manager.state().is_consistent());
}
