//! Database abstraction layer.
//!
//! A [`Driver`] opens [`Session`]s; a session executes statements and hands
//! back raw [`Fetched`] results. Two interchangeable backends exist, selected
//! once through [`DriverKind`]. Nothing above this module knows which one is
//! linked.

mod mock;
mod native;
mod numeric;
mod params;
mod postgres;
mod schema;
mod types;

pub use mock::{MockCatalog, MockCounters, MockDriver};
pub use native::TokioPostgresDriver;
pub use postgres::SqlxDriver;
pub use schema::{
    format_schema_block, system_tables_reference, ColumnDescriptor, TableDescriptor,
    DESCRIBE_COLUMNS, SYSTEM_TABLES,
};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default Redshift port.
pub const DEFAULT_PORT: u16 = 5439;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Supported driver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// sqlx over a single `PgConnection`.
    #[default]
    Sqlx,
    /// tokio-postgres `Client` with a spawned connection task.
    TokioPostgres,
}

impl DriverKind {
    /// Returns the driver name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlx => "sqlx",
            Self::TokioPostgres => "tokio-postgres",
        }
    }

    /// Parses a driver name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "sqlx" => Some(Self::Sqlx),
            "tokio-postgres" | "native" => Some(Self::TokioPostgres),
            _ => None,
        }
    }

    /// Creates the driver for this backend.
    ///
    /// This is the only place a backend is chosen.
    pub fn build(&self) -> Box<dyn Driver> {
        match self {
            Self::Sqlx => Box::new(SqlxDriver::new()),
            Self::TokioPostgres => Box::new(TokioPostgresDriver::new()),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open a session.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Upper bound on establishing the session.
    pub connect_timeout: Duration,
}

impl ConnectParams {
    /// Creates connection parameters with the default timeout.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns `host:port/database` for messages.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Raw outcome of one statement, before it is shaped into a [`QueryResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
    /// Result-set description; `None` when the statement returns no rows by
    /// nature (DDL, DML without RETURNING, SET, ...).
    pub description: Option<Vec<ColumnInfo>>,

    /// Rows in server order.
    pub rows: Vec<Row>,
}

impl Fetched {
    /// A result for a statement that produced no result set.
    pub fn no_result() -> Self {
        Self::default()
    }

    /// A result set with the given columns and rows.
    pub fn rows(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            description: Some(columns),
            rows,
        }
    }
}

/// Opens sessions against a warehouse.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Opens a new authenticated session.
    ///
    /// Fails with [`crate::WardenError::Connection`] carrying the driver's own
    /// message. No retries are attempted.
    async fn open_session(&self, params: &ConnectParams) -> Result<Box<dyn Session>>;
}

/// A live, authenticated connection.
///
/// A session runs one statement at a time; `&mut self` receivers make that
/// exclusive.
#[async_trait]
pub trait Session: Send {
    /// Executes `sql`, binding `params` positionally (`$1`, `$2`, ...), and
    /// fetches every resulting row.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Fetched>;

    /// Rolls back any open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Closes the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Returns a short hint for a connection failure message, if one applies.
///
/// The driver's own message is always shown; the hint is appended.
pub(crate) fn connection_hint(message: &str, params: &ConnectParams) -> Option<String> {
    let lower = message.to_lowercase();

    if lower.contains("connection refused") || lower.contains("could not connect") {
        Some(format!(
            "Check that the server at {}:{} is running.",
            params.host, params.port
        ))
    } else if lower.contains("password authentication failed")
        || lower.contains("authentication failed")
    {
        Some(format!(
            "Check the credentials for user '{}'.",
            params.user
        ))
    } else if lower.contains("does not exist") && lower.contains("database") {
        Some(format!("Database '{}' does not exist.", params.database))
    } else if lower.contains("ssl") || lower.contains("tls") {
        Some("The server may require SSL.".to_string())
    } else if lower.contains("timed out") || lower.contains("timeout") {
        Some(format!(
            "{}:{} may be overloaded or unreachable.",
            params.host, params.port
        ))
    } else {
        None
    }
}

/// Builds a connection error from a driver message plus an optional hint.
pub(crate) fn connection_error(message: String, params: &ConnectParams) -> crate::WardenError {
    match connection_hint(&message, params) {
        Some(hint) => crate::WardenError::connection(format!("{message} ({hint})")),
        None => crate::WardenError::connection(message),
    }
}
