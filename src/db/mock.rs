//! Mock driver for testing.
//!
//! Serves an in-memory catalog through the same introspection queries the
//! schema explorer issues, counts every session operation, and can be told
//! to fail at each step. Clones share state, so a test can keep one handle
//! while the connection manager owns another.

use super::{
    ColumnDescriptor, ColumnInfo, ConnectParams, Driver, Fetched, Row, Session, Value,
    DESCRIBE_COLUMNS,
};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory schemas, tables and columns.
///
/// Schemas and tables iterate in name order. Columns keep insertion order,
/// which stands in for ordinal position.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    schemas: BTreeMap<String, BTreeMap<String, Vec<ColumnDescriptor>>>,
}

impl MockCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty schema.
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schemas.entry(schema.to_string()).or_default();
        self
    }

    /// Adds a table, creating its schema if needed.
    pub fn with_table(mut self, schema: &str, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.schemas
            .entry(schema.to_string())
            .or_default()
            .insert(table.to_string(), columns);
        self
    }

    /// A small warehouse: `public.orders`, `public.users`, `sales.regions`
    /// plus the system schemas.
    pub fn fixture() -> Self {
        let id = ColumnDescriptor {
            name: "id".to_string(),
            data_type: "integer".to_string(),
            numeric_precision: Some(32),
            numeric_scale: Some(0),
            is_nullable: "NO".to_string(),
            ..ColumnDescriptor::default()
        };
        let email = ColumnDescriptor {
            max_length: Some(256),
            ..ColumnDescriptor::new("email", "character varying")
        };
        let total = ColumnDescriptor {
            numeric_precision: Some(12),
            numeric_scale: Some(2),
            default: Some("0".to_string()),
            ..ColumnDescriptor::new("total", "numeric")
        };
        let created_at = ColumnDescriptor::new("created_at", "timestamp without time zone");
        let region = ColumnDescriptor {
            max_length: Some(32),
            is_nullable: "NO".to_string(),
            ..ColumnDescriptor::new("region", "character varying")
        };

        Self::new()
            .with_schema("pg_catalog")
            .with_schema("information_schema")
            .with_table("public", "users", vec![id.clone(), email, created_at])
            .with_table("public", "orders", vec![id, total])
            .with_table("sales", "regions", vec![region])
    }

    fn schema_rows(&self) -> Vec<Row> {
        self.schemas
            .keys()
            .map(|s| vec![Value::from(s.as_str())])
            .collect()
    }

    fn table_rows(&self, schema: &str) -> Vec<Row> {
        self.schemas
            .get(schema)
            .map(|tables| tables.keys().map(|t| vec![Value::from(t.as_str())]).collect())
            .unwrap_or_default()
    }

    fn column_rows(&self, schema: &str, table: &str) -> Vec<Row> {
        let Some(columns) = self.schemas.get(schema).and_then(|t| t.get(table)) else {
            return Vec::new();
        };
        columns
            .iter()
            .map(|c| {
                vec![
                    Value::from(c.name.as_str()),
                    Value::from(c.data_type.as_str()),
                    Value::from(c.max_length),
                    Value::from(c.numeric_precision),
                    Value::from(c.numeric_scale),
                    Value::from(c.is_nullable.as_str()),
                    Value::from(c.default.clone()),
                ]
            })
            .collect()
    }
}

/// Operation counts shared by a mock driver and its sessions.
#[derive(Debug, Default)]
pub struct MockCounters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    executes: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl MockCounters {
    /// Sessions successfully opened.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Sessions closed, successfully or not.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Statements that reached a session.
    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    /// Rollbacks requested.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.opens().saturating_sub(self.closes())
    }
}

#[derive(Debug, Default)]
struct Failures {
    connect: Option<String>,
    close: Option<String>,
    rollback: Option<String>,
    queries: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct MockState {
    catalog: Mutex<MockCatalog>,
    failures: Mutex<Failures>,
    responses: Mutex<Vec<(String, Fetched)>>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
    counters: MockCounters,
}

// Poisoning only happens if a test panicked mid-lock; the data is still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A driver whose sessions answer from a [`MockCatalog`].
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    /// Creates a mock driver with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock driver serving the given catalog.
    pub fn with_catalog(catalog: MockCatalog) -> Self {
        let driver = Self::new();
        *lock(&driver.state.catalog) = catalog;
        driver
    }

    /// Makes every subsequent connect attempt fail with `message`.
    pub fn fail_connect(&self, message: impl Into<String>) {
        lock(&self.state.failures).connect = Some(message.into());
    }

    /// Makes closing a session fail with `message`.
    pub fn fail_close(&self, message: impl Into<String>) {
        lock(&self.state.failures).close = Some(message.into());
    }

    /// Makes rollbacks fail with `message`.
    pub fn fail_rollback(&self, message: impl Into<String>) {
        lock(&self.state.failures).rollback = Some(message.into());
    }

    /// Makes statements containing `pattern` (case-insensitive) fail.
    pub fn fail_query(&self, pattern: impl Into<String>, message: impl Into<String>) {
        lock(&self.state.failures)
            .queries
            .push((pattern.into().to_lowercase(), message.into()));
    }

    /// Removes every scripted failure.
    pub fn clear_failures(&self) {
        *lock(&self.state.failures) = Failures::default();
    }

    /// Answers statements containing `pattern` (case-insensitive) with
    /// `fetched`. Checked before the built-in catalog queries.
    pub fn respond(&self, pattern: impl Into<String>, fetched: Fetched) {
        lock(&self.state.responses).push((pattern.into().to_lowercase(), fetched));
    }

    /// Returns the operation counters.
    pub fn counters(&self) -> &MockCounters {
        &self.state.counters
    }

    /// Returns every statement that reached a session, with its parameters.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        lock(&self.state.executed).clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn open_session(&self, params: &ConnectParams) -> Result<Box<dyn Session>> {
        if let Some(msg) = lock(&self.state.failures).connect.clone() {
            return Err(WardenError::connection(msg));
        }
        if params.host.is_empty() {
            return Err(WardenError::connection("could not translate host name \"\""));
        }

        self.state.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    state: Arc<MockState>,
}

impl MockSession {
    fn answer(&self, sql: &str, params: &[Value]) -> Fetched {
        let lower = sql.to_lowercase();
        let param = |i: usize| params.get(i).and_then(Value::as_str).unwrap_or_default();

        if let Some((_, fetched)) = lock(&self.state.responses)
            .iter()
            .find(|(pattern, _)| lower.contains(pattern.as_str()))
        {
            return fetched.clone();
        }

        let catalog = lock(&self.state.catalog);
        if lower.contains("information_schema.schemata") {
            Fetched::rows(
                vec![ColumnInfo::new("schema_name", "name")],
                catalog.schema_rows(),
            )
        } else if lower.contains("information_schema.tables") {
            Fetched::rows(
                vec![ColumnInfo::new("table_name", "name")],
                catalog.table_rows(param(0)),
            )
        } else if lower.contains("information_schema.columns") {
            Fetched::rows(
                DESCRIBE_COLUMNS
                    .iter()
                    .map(|c| ColumnInfo::new(*c, "text"))
                    .collect(),
                catalog.column_rows(param(0), param(1)),
            )
        } else if lower.trim() == "select 1" {
            Fetched::rows(
                vec![ColumnInfo::new("?column?", "int4")],
                vec![vec![Value::Int(1)]],
            )
        } else if lower.trim_start().starts_with("select") {
            Fetched::rows(
                vec![ColumnInfo::new("result", "text")],
                vec![vec![Value::String(format!("Mock result for: {}", sql))]],
            )
        } else {
            Fetched::no_result()
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Fetched> {
        self.state.counters.executes.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.executed).push((sql.to_string(), params.to_vec()));

        let lower = sql.to_lowercase();
        let failure = lock(&self.state.failures)
            .queries
            .iter()
            .find(|(pattern, _)| lower.contains(pattern.as_str()))
            .map(|(_, msg)| msg.clone());
        if let Some(msg) = failure {
            return Err(WardenError::query(msg));
        }

        Ok(self.answer(sql, params))
    }

    async fn rollback(&mut self) -> Result<()> {
        self.state.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        match lock(&self.state.failures).rollback.clone() {
            Some(msg) => Err(WardenError::query(msg)),
            None => Ok(()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.counters.closes.fetch_add(1, Ordering::SeqCst);
        match lock(&self.state.failures).close.clone() {
            Some(msg) => Err(WardenError::disconnect(msg)),
            None => Ok(()),
        }
    }
}
