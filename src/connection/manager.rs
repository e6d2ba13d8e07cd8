//! Connection manager for the session lifecycle.

use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{ConnectionState, Cursor};
use crate::db::{ConnectParams, Driver, Session, DEFAULT_CONNECT_TIMEOUT_SECS};
use crate::error::{Result, WardenError};
use crate::safety::AccessMode;

/// Identifies the current connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub host: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub is_connected: bool,
    pub mode: AccessMode,
    /// Name of the driver backend in use.
    pub driver: String,
}

/// Opens and closes the single session and owns its state.
pub struct ConnectionManager {
    driver: Box<dyn Driver>,
    state: ConnectionState,
    mode: AccessMode,
    connect_timeout: Duration,
}

impl ConnectionManager {
    /// Creates a disconnected manager.
    pub fn new(driver: Box<dyn Driver>, mode: AccessMode) -> Self {
        Self {
            driver,
            state: ConnectionState::default(),
            mode,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Sets the upper bound on establishing a session.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The access mode statements are classified under.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Name of the driver backend.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Read-only view of the connection state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Connects to `host:port/database` as `user`.
    ///
    /// Any open session is closed first; a failure while closing it is
    /// logged and otherwise ignored. On failure the manager is left
    /// disconnected.
    pub async fn connect(
        &mut self,
        host: &str,
        database: &str,
        user: &str,
        password: &str,
        port: u16,
    ) -> Result<ConnectionInfo> {
        let params = ConnectParams::new(host, port, database, user, password)
            .with_connect_timeout(self.connect_timeout);
        self.connect_with(&params).await
    }

    /// Connects using prepared parameters. See [`ConnectionManager::connect`].
    pub async fn connect_with(&mut self, params: &ConnectParams) -> Result<ConnectionInfo> {
        if let Some(previous) = self.state.reset() {
            if let Err(e) = previous.close().await {
                warn!("Failed to close previous session: {}", e);
            }
        }

        match self.driver.open_session(params).await {
            Ok(session) => {
                self.state
                    .establish(session, &params.host, &params.database, &params.user);
                info!(
                    "Successfully connected to {}/{} as {} ({})",
                    params.host,
                    params.database,
                    params.user,
                    self.driver.name()
                );
                Ok(self.connection_info())
            }
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        }
    }

    /// Closes the session, if any.
    ///
    /// The state is reset whether or not closing succeeds, so calling this
    /// while disconnected succeeds.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(session) = self.state.reset() else {
            return Ok(());
        };

        match session.close().await {
            Ok(()) => {
                info!("Disconnected successfully");
                Ok(())
            }
            Err(e) => {
                let e = if matches!(e, WardenError::Disconnect(_)) {
                    e
                } else {
                    WardenError::disconnect(e.to_string())
                };
                error!("{}", e);
                Err(e)
            }
        }
    }

    /// Returns true if a session is open.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Describes the current connection.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            host: self.state.host().map(str::to_string),
            database: self.state.database().map(str::to_string),
            user: self.state.user().map(str::to_string),
            is_connected: self.state.is_connected(),
            mode: self.mode,
            driver: self.driver.name().to_string(),
        }
    }

    /// The session and cursor, if connected.
    pub(crate) fn active(&mut self) -> Option<(&mut dyn Session, &mut Cursor)> {
        self.state.active()
    }
}
