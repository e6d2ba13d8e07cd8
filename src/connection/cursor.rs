//! Execution handle derived from a session.

use crate::db::{ColumnInfo, Row, Session, Value};
use crate::error::Result;

/// Runs statements on a session and holds the latest result until fetched.
///
/// A fresh cursor is created on every successful connect and dropped on
/// disconnect.
#[derive(Debug, Default)]
pub struct Cursor {
    description: Option<Vec<ColumnInfo>>,
    pending: Vec<Row>,
    executions: u64,
}

impl Cursor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Executes `sql` on `session`, replacing any previous result.
    ///
    /// On failure the cursor is left empty.
    pub async fn execute(
        &mut self,
        session: &mut dyn Session,
        sql: &str,
        params: &[Value],
    ) -> Result<()> {
        self.description = None;
        self.pending.clear();
        self.executions += 1;

        let fetched = session.execute(sql, params).await?;
        self.description = fetched.description;
        self.pending = fetched.rows;
        Ok(())
    }

    /// Column metadata of the last result, or `None` if the last statement
    /// produced no result set.
    pub fn description(&self) -> Option<&[ColumnInfo]> {
        self.description.as_deref()
    }

    /// Takes every pending row.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.pending)
    }

    /// Number of statements run through this cursor.
    pub fn executions(&self) -> u64 {
        self.executions
    }
}
