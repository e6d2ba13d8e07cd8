//! Schema introspection integration tests.

use super::{live_warden, unique_name, DRIVERS};
use redshift_warden::db::{ColumnDescriptor, MockCatalog, MockDriver, TableDescriptor};
use redshift_warden::{AccessMode, Warden};

#[tokio::test]
async fn test_list_schemas_against_fixture() {
    let catalog = MockCatalog::new()
        .with_schema("sales")
        .with_schema("public")
        .with_schema("pg_catalog");
    let mut warden = Warden::new(
        Box::new(MockDriver::with_catalog(catalog)),
        AccessMode::ReadOnly,
    );
    warden.connect("mock", "dev", "u", "p", None).await;

    let schemas = warden.list_schemas().await.unwrap();
    assert_eq!(schemas.first_column_strings(), vec!["public", "sales"]);
}

#[tokio::test]
async fn test_describe_matches_created_columns() {
    let columns = vec![
        ColumnDescriptor::new("event_id", "bigint"),
        ColumnDescriptor::new("occurred_at", "timestamp without time zone"),
        ColumnDescriptor::new("payload", "character varying"),
        ColumnDescriptor::new("amount", "numeric"),
    ];
    let catalog = MockCatalog::new().with_table("events", "clicks", columns.clone());
    let mut warden = Warden::new(
        Box::new(MockDriver::with_catalog(catalog)),
        AccessMode::ReadOnly,
    );
    warden.connect("mock", "dev", "u", "p", None).await;

    let result = warden
        .describe_table("clicks", Some("events"))
        .await
        .unwrap();
    let described = TableDescriptor::from_result("events", "clicks", &result);

    assert_eq!(described.columns, columns);
}

#[tokio::test]
async fn test_live_schema_round_trip() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::Admin).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };
        let schema = unique_name("warden_it");

        warden
            .execute_query(&format!("CREATE SCHEMA {schema}"), &[])
            .await
            .unwrap();
        warden
            .execute_query(
                &format!(
                    "CREATE TABLE {schema}.orders (
                        id integer NOT NULL,
                        customer varchar(64),
                        total numeric(12,2) DEFAULT 0,
                        placed_at timestamp
                    )"
                ),
                &[],
            )
            .await
            .unwrap();

        let schemas = warden.all_schema_names().await;
        assert!(schemas.contains(&schema));
        assert!(!schemas.iter().any(|s| s == "pg_catalog" || s == "information_schema"));

        let tables = warden.list_tables(&schema).await.unwrap();
        assert_eq!(tables.first_column_strings(), vec!["orders"]);

        let columns = warden
            .describe_table("orders", Some(&schema))
            .await
            .unwrap();
        let names: Vec<String> = columns
            .rows
            .iter()
            .map(|r| r[0].to_display_string())
            .collect();
        assert_eq!(names, vec!["id", "customer", "total", "placed_at"]);

        let summary = warden.get_table_schema_info(Some(&schema), None).await;
        assert!(summary.starts_with(&format!("Schema: {schema}\nTables:\n\norders:\n")));
        assert!(summary.contains("  - id (integer(32), nullable: NO)\n"));
        assert!(summary.contains("  - customer (character varying(64), nullable: YES)\n"));
        assert!(summary.contains("  - total (numeric(12,2), nullable: YES, default: "));

        warden
            .execute_query(&format!("DROP SCHEMA {schema} CASCADE"), &[])
            .await
            .unwrap();
        warden.disconnect().await;
    }
}

#[tokio::test]
async fn test_live_unknown_schema_has_no_tables() {
    for kind in DRIVERS {
        let Some(mut warden) = live_warden(kind, AccessMode::ReadOnly).await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let tables = warden.list_tables("no_such_schema_xyz").await.unwrap();
        assert!(tables.is_empty());
        assert_eq!(
            warden
                .get_table_schema_info(Some("no_such_schema_xyz"), None)
                .await,
            "Schema: no_such_schema_xyz\nTables:\n"
        );
        warden.disconnect().await;
    }
}
