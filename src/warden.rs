//! The boundary exposed to the UI and to SQL-generation collaborators.
//!
//! [`Warden`] owns one [`ConnectionManager`] and routes every operation
//! through the executor or the explorer. Connect and disconnect report a
//! success flag with a message; the tabular operations return
//! [`Result`], whose error displays as the message shown to users.

use crate::config::Config;
use crate::connection::{ConnectionInfo, ConnectionManager};
use crate::db::{system_tables_reference, Driver, QueryResult, Value, DEFAULT_PORT};
use crate::error::Result;
use crate::query::{QueryExecutor, SchemaExplorer};
use crate::safety::AccessMode;

/// Schema used by [`Warden::describe_table`] when none is given.
pub const DEFAULT_SCHEMA: &str = "public";

/// Guarded access to a single warehouse session.
pub struct Warden {
    connection: ConnectionManager,
}

impl Warden {
    /// Creates a disconnected warden over `driver`.
    pub fn new(driver: Box<dyn Driver>, mode: AccessMode) -> Self {
        Self {
            connection: ConnectionManager::new(driver, mode),
        }
    }

    /// Creates a disconnected warden with the configured driver, access
    /// mode and connect timeout.
    pub fn from_config(config: &Config) -> Self {
        let connection = ConnectionManager::new(config.driver.build(), config.access_mode)
            .with_connect_timeout(config.connect_timeout());
        Self { connection }
    }

    /// Creates a disconnected warden configured from `.env` and the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(&Config::from_env()?))
    }

    /// The access mode statements are classified under.
    pub fn mode(&self) -> AccessMode {
        self.connection.mode()
    }

    /// The underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Connects, closing any open session first. `port` defaults to 5439.
    ///
    /// Returns `(true, "Successfully connected to host/database")`, or
    /// `(false, message)` with the driver's failure text.
    pub async fn connect(
        &mut self,
        host: &str,
        database: &str,
        user: &str,
        password: &str,
        port: Option<u16>,
    ) -> (bool, String) {
        let port = port.unwrap_or(DEFAULT_PORT);
        match self
            .connection
            .connect(host, database, user, password, port)
            .await
        {
            Ok(_) => (true, format!("Successfully connected to {host}/{database}")),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Connects using the connection section of `config`.
    pub async fn connect_with_config(&mut self, config: &Config) -> (bool, String) {
        let params = match config.connection.to_connect_params(config.connect_timeout()) {
            Ok(params) => params,
            Err(e) => return (false, e.to_string()),
        };

        match self.connection.connect_with(&params).await {
            Ok(_) => (
                true,
                format!(
                    "Successfully connected to {}/{}",
                    params.host, params.database
                ),
            ),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Closes the session. Always leaves the warden disconnected.
    pub async fn disconnect(&mut self) -> (bool, String) {
        match self.connection.disconnect().await {
            Ok(()) => (true, "Disconnected successfully".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Returns true if a session is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Describes the current connection.
    pub fn connection_info(&self) -> ConnectionInfo {
        self.connection.connection_info()
    }

    /// Executes `sql` with positional parameters.
    pub async fn execute_query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        QueryExecutor::new(&mut self.connection)
            .execute(sql, params)
            .await
    }

    /// Lists user schemas.
    pub async fn list_schemas(&mut self) -> Result<QueryResult> {
        self.explorer().list_schemas().await
    }

    /// Lists base tables of `schema`.
    pub async fn list_tables(&mut self, schema: &str) -> Result<QueryResult> {
        self.explorer().list_tables(schema).await
    }

    /// Describes the columns of `table` in `schema` (default `public`).
    pub async fn describe_table(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<QueryResult> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        self.explorer().describe_table(table, schema).await
    }

    /// Returns the user schema names, or an empty list on failure.
    pub async fn all_schema_names(&mut self) -> Vec<String> {
        self.explorer().all_schema_names().await
    }

    /// Returns the schema summary for `schema`, or for every user schema when
    /// `schema` is `None` or `ALL`. Never fails; errors become the text.
    pub async fn get_table_schema_info(
        &mut self,
        schema: Option<&str>,
        max_tables: Option<usize>,
    ) -> String {
        self.explorer().table_schema_info(schema, max_tables).await
    }

    /// Returns the reference text for the Redshift performance views.
    pub fn system_tables_reference(&self) -> String {
        system_tables_reference()
    }

    fn explorer(&mut self) -> SchemaExplorer<'_> {
        SchemaExplorer::new(&mut self.connection)
    }
}
