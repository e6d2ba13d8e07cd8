//! Statement safety classification.
//!
//! Decides whether a SQL statement may run under the configured access mode.
//! The decision looks at the leading keyword only; see [`classify`].

mod classifier;

pub use classifier::{classify, leading_verb, Verdict, READ_ONLY_DENYLIST};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy tier controlling which SQL verbs are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Mutating and DDL verbs are rejected before reaching the database.
    #[default]
    ReadOnly,
    /// Every statement is passed through.
    ReadWrite,
    /// Every statement is passed through.
    Admin,
}

impl AccessMode {
    /// Returns the canonical name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::ReadWrite => "read-write",
            Self::Admin => "admin",
        }
    }

    /// Parses a mode name, returning `None` for unrecognized values.
    ///
    /// Case-insensitive; `-`, `_` or no separator are all accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "read-only" | "readonly" => Some(Self::ReadOnly),
            "read-write" | "readwrite" => Some(Self::ReadWrite),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Parses a mode name, coercing anything unrecognized to read-only.
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!("Unrecognized access mode '{}', using read-only", s);
            Self::ReadOnly
        })
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
