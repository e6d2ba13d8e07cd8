//! Leading-verb classification.
//!
//! Only the first whitespace-delimited token is inspected. Statements that
//! start with a comment, hide a mutation inside a CTE, or otherwise disguise
//! their verb are not detected; this is a coarse guard in front of the
//! database's own permission system, not a parser.

use super::AccessMode;

/// Verbs rejected in read-only mode.
pub const READ_ONLY_DENYLIST: &[&str] = &[
    "insert", "update", "delete", "drop", "truncate", "alter", "create", "grant", "revoke",
    "comment", "set", "copy", "unload", "vacuum", "analyze", "merge",
];

/// Outcome of classifying a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The statement may be executed.
    Allowed,
    /// The statement must not reach the database.
    Denied {
        /// The offending verb, lower-cased.
        verb: String,
        /// Message naming the verb and the mode.
        reason: String,
    },
}

impl Verdict {
    /// Returns true if the statement may be executed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Returns the lower-cased first token of `sql`, or an empty string.
pub fn leading_verb(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Classifies `sql` under `mode`.
///
/// Denies only when the mode is read-only and the leading verb is in
/// [`READ_ONLY_DENYLIST`]. An empty statement has an empty verb and is
/// always allowed.
pub fn classify(sql: &str, mode: AccessMode) -> Verdict {
    let verb = leading_verb(sql);

    if mode == AccessMode::ReadOnly && READ_ONLY_DENYLIST.contains(&verb.as_str()) {
        let reason = format!(
            "'{}' statements are not allowed in {} mode.",
            verb.to_uppercase(),
            mode
        );
        return Verdict::Denied { verb, reason };
    }

    Verdict::Allowed
}
