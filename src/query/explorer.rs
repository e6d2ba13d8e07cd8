//! Schema introspection over the guarded execution path.
//!
//! All lookups are fixed information_schema queries with schema and table
//! names passed as bound parameters.

use tracing::{debug, warn};

use super::QueryExecutor;
use crate::connection::ConnectionManager;
use crate::db::{format_schema_block, QueryResult, TableDescriptor, Value};
use crate::error::Result;

/// Schemas never reported as user schemas.
pub const SYSTEM_SCHEMAS: [&str; 2] = ["pg_catalog", "information_schema"];

const LIST_SCHEMAS_SQL: &str = "\
SELECT schema_name::text AS schema_name
FROM information_schema.schemata
WHERE schema_name NOT IN ($1, $2)
ORDER BY schema_name";

const LIST_TABLES_SQL: &str = "\
SELECT table_name::text AS table_name
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name";

const DESCRIBE_TABLE_SQL: &str = "\
SELECT
    column_name::text AS column_name,
    data_type::text AS data_type,
    character_maximum_length,
    numeric_precision,
    numeric_scale,
    is_nullable::text AS is_nullable,
    column_default::text AS column_default
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position";

const NO_SCHEMA_INFO: &str = "No schema info available.";

/// Lists schemas and tables, describes tables, and builds the schema summary.
pub struct SchemaExplorer<'a> {
    executor: QueryExecutor<'a>,
}

impl<'a> SchemaExplorer<'a> {
    /// Creates an explorer over `connection`.
    pub fn new(connection: &'a mut ConnectionManager) -> Self {
        Self {
            executor: QueryExecutor::new(connection),
        }
    }

    /// Lists user schemas in alphabetical order.
    ///
    /// System schemas are excluded by the query and again from whatever
    /// the server returns.
    pub async fn list_schemas(&mut self) -> Result<QueryResult> {
        let params = SYSTEM_SCHEMAS.map(Value::from);
        let mut result = self.executor.execute(LIST_SCHEMAS_SQL, &params).await?;

        result.rows.retain(|row| {
            !matches!(row.first(), Some(Value::String(s)) if SYSTEM_SCHEMAS.contains(&s.as_str()))
        });
        result.row_count = result.rows.len();
        Ok(result)
    }

    /// Lists base tables of `schema` in alphabetical order.
    pub async fn list_tables(&mut self, schema: &str) -> Result<QueryResult> {
        self.executor
            .execute(LIST_TABLES_SQL, &[Value::from(schema)])
            .await
    }

    /// Describes the columns of `schema.table` in ordinal order.
    pub async fn describe_table(&mut self, table: &str, schema: &str) -> Result<QueryResult> {
        self.executor
            .execute(DESCRIBE_TABLE_SQL, &[Value::from(schema), Value::from(table)])
            .await
    }

    /// Describes `schema.table` as a [`TableDescriptor`].
    pub async fn table_descriptor(&mut self, table: &str, schema: &str) -> Result<TableDescriptor> {
        let result = self.describe_table(table, schema).await?;
        Ok(TableDescriptor::from_result(schema, table, &result))
    }

    /// Returns the user schema names, or an empty list if they cannot be read.
    pub async fn all_schema_names(&mut self) -> Vec<String> {
        match self.list_schemas().await {
            Ok(result) => result.first_column_strings(),
            Err(e) => {
                warn!("Could not list schemas: {}", e);
                Vec::new()
            }
        }
    }

    /// Formats the summary of every table in `schema`.
    ///
    /// Returns `Error getting tables: <message>` instead of failing when the
    /// tables cannot be listed.
    pub async fn format_schema_summary(&mut self, schema: &str) -> String {
        self.format_schema_summary_limited(schema, None).await
    }

    /// Like [`SchemaExplorer::format_schema_summary`], covering at most
    /// `max_tables` tables.
    pub async fn format_schema_summary_limited(
        &mut self,
        schema: &str,
        max_tables: Option<usize>,
    ) -> String {
        match self.schema_block(schema, max_tables).await {
            Ok(block) => block,
            Err(e) => format!("Error getting tables: {}", e),
        }
    }

    /// Formats the summary of one schema, or of every user schema when
    /// `schema` is `None` or `ALL`.
    ///
    /// In the all-schemas form, schemas whose tables cannot be listed are
    /// skipped and blocks are separated by a blank line.
    pub async fn table_schema_info(
        &mut self,
        schema: Option<&str>,
        max_tables: Option<usize>,
    ) -> String {
        let schema = schema.filter(|s| !s.trim().is_empty() && !s.eq_ignore_ascii_case("all"));
        if let Some(schema) = schema {
            return self.format_schema_summary_limited(schema, max_tables).await;
        }

        let mut blocks = Vec::new();
        for schema in self.all_schema_names().await {
            match self.schema_block(&schema, max_tables).await {
                Ok(block) => blocks.push(block),
                Err(e) => warn!("Skipping schema {}: {}", schema, e),
            }
        }

        if blocks.is_empty() {
            NO_SCHEMA_INFO.to_string()
        } else {
            blocks.join("\n\n")
        }
    }

    async fn schema_block(&mut self, schema: &str, max_tables: Option<usize>) -> Result<String> {
        let tables = self.list_tables(schema).await?.first_column_strings();
        let limit = max_tables.unwrap_or(usize::MAX);

        let mut descriptors = Vec::new();
        for table in tables.iter().take(limit) {
            match self.table_descriptor(table, schema).await {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => debug!("Skipping {}.{}: {}", schema, table, e),
            }
        }

        Ok(format_schema_block(schema, &descriptors))
    }
}
