//! Integration tests for redshift-warden.

pub mod connection_test;
pub mod query_test;
pub mod schema_test;
pub mod warden_test;

use redshift_warden::config::ConnectionConfig;
use redshift_warden::db::{ConnectParams, DriverKind};
use redshift_warden::{AccessMode, Warden};
use std::time::Duration;

/// Both driver backends, for tests that must behave the same on each.
pub const DRIVERS: [DriverKind; 2] = [DriverKind::Sqlx, DriverKind::TokioPostgres];

/// Returns connection parameters from DATABASE_URL, if set.
pub fn test_connect_params() -> Option<ConnectParams> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    config.to_connect_params(Duration::from_secs(10)).ok()
}

/// Returns a warden connected to the DATABASE_URL server, if set.
pub async fn live_warden(kind: DriverKind, mode: AccessMode) -> Option<Warden> {
    let params = test_connect_params()?;
    let mut warden = Warden::new(kind.build(), mode);
    let (ok, message) = warden
        .connect(
            &params.host,
            &params.database,
            &params.user,
            &params.password,
            Some(params.port),
        )
        .await;
    assert!(ok, "{kind}: {message}");
    Some(warden)
}

/// A name unlikely to collide with other test runs.
pub fn unique_name(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("{prefix}_{}_{nanos}", std::process::id())
}
