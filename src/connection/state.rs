//! The live session and what it is connected to.

use super::Cursor;
use crate::db::Session;

/// Session handle, cursor and connection metadata.
///
/// The cursor exists exactly when the state is connected and holds a
/// session. Only [`super::ConnectionManager`] mutates it.
#[derive(Default)]
pub struct ConnectionState {
    session: Option<Box<dyn Session>>,
    cursor: Option<Cursor>,
    host: Option<String>,
    database: Option<String>,
    user: Option<String>,
    is_connected: bool,
}

impl ConnectionState {
    /// Returns true between a successful connect and the next
    /// disconnect or reconnect attempt.
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Host of the current connection.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Database of the current connection.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// User of the current connection.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the cursor, if connected.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Returns true if the session, cursor and flag agree.
    pub fn is_consistent(&self) -> bool {
        let live = self.is_connected && self.session.is_some();
        self.cursor.is_some() == live && self.is_connected == self.session.is_some()
    }

    pub(crate) fn establish(
        &mut self,
        session: Box<dyn Session>,
        host: &str,
        database: &str,
        user: &str,
    ) {
        *self = Self {
            session: Some(session),
            cursor: Some(Cursor::new()),
            host: Some(host.to_string()),
            database: Some(database.to_string()),
            user: Some(user.to_string()),
            is_connected: true,
        };
    }

    /// Resets to the disconnected default, handing back any open session.
    pub(crate) fn reset(&mut self) -> Option<Box<dyn Session>> {
        std::mem::take(self).session
    }

    /// The session and cursor, if connected.
    pub(crate) fn active(&mut self) -> Option<(&mut dyn Session, &mut Cursor)> {
        if !self.is_connected {
            return None;
        }
        let session: &mut dyn Session = self.session.as_deref_mut()?;
        let cursor = self.cursor.as_mut()?;
        Some((session, cursor))
    }
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionState")
            .field("session", &self.session.as_ref().map(|_| "<session>"))
            .field("cursor", &self.cursor)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("is_connected", &self.is_connected)
            .finish()
    }
}
