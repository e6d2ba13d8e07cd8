//! Error types for the warden.
//!
//! Every failure a caller can observe maps to one variant here. None of them
//! is fatal: the caller can always issue a new request afterwards.

use thiserror::Error;

use crate::safety::AccessMode;

/// Main error type for warden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Driver, network or authentication failure while connecting.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A statement was submitted while no session is open.
    #[error("Not connected to database")]
    NotConnected,

    /// The statement's verb is denied under the active access mode.
    #[error("'{verb}' statements are not allowed in {mode} mode.")]
    Forbidden { verb: String, mode: AccessMode },

    /// Driver-level error during execute or fetch. The session stays open.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Closing the underlying session failed. State is reset regardless.
    #[error("Disconnect failed: {0}")]
    Disconnect(String),

    /// Invalid config file, bad connection string, missing parameters.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WardenError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a forbidden-statement error for `verb` under `mode`.
    ///
    /// The verb is stored upper-cased, as it is shown to the user.
    pub fn forbidden(verb: &str, mode: AccessMode) -> Self {
        Self::Forbidden {
            verb: verb.to_uppercase(),
            mode,
        }
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Creates a disconnect error with the given message.
    pub fn disconnect(msg: impl Into<String>) -> Self {
        Self::Disconnect(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::NotConnected => "Not Connected",
            Self::Forbidden { .. } => "Forbidden",
            Self::QueryFailed(_) => "Query Error",
            Self::Disconnect(_) => "Disconnect Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using WardenError.
pub type Result<T> = std::result::Result<T, WardenError>;
