//! End-to-end tests of the warden boundary over the mock driver.

use redshift_warden::config::Config;
use redshift_warden::db::{MockCatalog, MockDriver, Value};
use redshift_warden::safety::{classify, Verdict};
use redshift_warden::{AccessMode, Warden, WardenError};

#[test]
fn test_drop_denied_in_read_only() {
    match classify("DROP TABLE users", AccessMode::ReadOnly) {
        Verdict::Denied { reason, .. } => assert!(reason.contains("DROP")),
        Verdict::Allowed => panic!("DROP allowed in read-only mode"),
    }
}

#[tokio::test]
async fn test_drop_executed_in_admin() {
    let driver = MockDriver::new();
    let mut warden = Warden::new(Box::new(driver.clone()), AccessMode::Admin);
    warden.connect("mock", "dev", "u", "p", None).await;

    assert!(classify("DROP TABLE users", AccessMode::Admin).is_allowed());
    let result = warden.execute_query("DROP TABLE users", &[]).await.unwrap();

    assert!(result.columns.is_empty());
    let executed = driver.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].0, "DROP TABLE users");
}

#[tokio::test]
async fn test_select_one_on_connected_fixture() {
    let mut warden = Warden::new(
        Box::new(MockDriver::with_catalog(MockCatalog::fixture())),
        AccessMode::ReadOnly,
    );
    let (ok, _) = warden.connect("mock", "dev", "u", "p", None).await;
    assert!(ok);

    let result = warden.execute_query("SELECT 1", &[]).await.unwrap();
    assert_eq!(result.columns.len(), 1);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
}

#[tokio::test]
async fn test_disconnected_warden_never_calls_driver() {
    let driver = MockDriver::with_catalog(MockCatalog::fixture());
    let mut warden = Warden::new(Box::new(driver.clone()), AccessMode::Admin);

    assert!(matches!(
        warden.execute_query("SELECT 1", &[]).await,
        Err(WardenError::NotConnected)
    ));
    assert!(matches!(
        warden.list_tables("public").await,
        Err(WardenError::NotConnected)
    ));
    assert!(matches!(
        warden.describe_table("users", None).await,
        Err(WardenError::NotConnected)
    ));
    assert_eq!(driver.counters().executes(), 0);
}

#[tokio::test]
async fn test_disconnect_twice() {
    let driver = MockDriver::new();
    let mut warden = Warden::new(Box::new(driver.clone()), AccessMode::ReadOnly);
    warden.connect("mock", "dev", "u", "p", None).await;

    assert!(warden.disconnect().await.0);
    assert!(warden.disconnect().await.0);
    assert!(!warden.is_connected());
    assert_eq!(driver.counters().closes(), 1);
}

#[tokio::test]
async fn test_summary_for_every_schema() {
    let mut warden = Warden::new(
        Box::new(MockDriver::with_catalog(MockCatalog::fixture())),
        AccessMode::ReadOnly,
    );
    warden.connect("mock", "dev", "u", "p", None).await;

    let summary = warden.get_table_schema_info(None, None).await;
    let blocks: Vec<&str> = summary.split("\n\nSchema: ").collect();

    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].starts_with("Schema: public\n"));
    assert!(blocks[0].contains("\nusers:\n"));
    assert!(blocks[1].starts_with("sales\n"));
    assert_eq!(summary, warden.get_table_schema_info(Some("all"), None).await);
}

#[test]
fn test_env_access_mode_is_coerced() {
    let mut config = Config::default();
    config
        .apply_env_with(|name: &str| (name == "WARDEN_ACCESS_MODE").then(|| "sudo".to_string()))
        .unwrap();

    assert_eq!(config.access_mode, AccessMode::ReadOnly);
    assert_eq!(Warden::from_config(&config).mode(), AccessMode::ReadOnly);
}
