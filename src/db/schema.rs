//! Table descriptors and the textual schema summary.
//!
//! The summary produced here is handed verbatim to SQL-generation
//! collaborators, so its layout must not drift.

use serde::Serialize;

use super::types::{QueryResult, Value};

/// Columns selected by the describe-table introspection query, in order.
pub const DESCRIBE_COLUMNS: [&str; 7] = [
    "column_name",
    "data_type",
    "character_maximum_length",
    "numeric_precision",
    "numeric_scale",
    "is_nullable",
    "column_default",
];

/// Header of the system tables reference.
const SYSTEM_TABLES_HEADER: &str = "Amazon Redshift System Tables/Views for Performance Analysis:";

/// Redshift performance views and the columns worth querying on each.
pub const SYSTEM_TABLES: &[(&str, &[&str])] = &[
    (
        "STL_QUERY",
        &[
            "userid",
            "query",
            "starttime",
            "endtime",
            "elapsed",
            "aborted",
            "rows",
            "label",
            "text",
        ],
    ),
    (
        "SVV_TABLE_INFO",
        &[
            "table", "schema", "size", "tbl_rows", "unsorted", "stats_off", "pct_used",
        ],
    ),
    (
        "SVV_DISKUSAGE",
        &[
            "schema",
            "table",
            "size",
            "perm_table_rows",
            "spectrum_table_rows",
        ],
    ),
    (
        "SVL_QLOG",
        &[
            "userid",
            "query",
            "starttime",
            "endtime",
            "aborted",
            "elapsed",
            "label",
            "text",
        ],
    ),
    (
        "STL_ALERT_EVENT_LOG",
        &["event_time", "event_severity", "event_message", "solution"],
    ),
];

/// A table and its columns in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Schema the table lives in.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Columns in ordinal position order.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Creates a table descriptor with no columns.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Builds a descriptor from a describe-table result.
    pub fn from_result(
        schema: impl Into<String>,
        name: impl Into<String>,
        result: &QueryResult,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: ColumnDescriptor::from_result(result),
        }
    }

    /// Formats the table block of the schema summary.
    ///
    /// ```text
    ///
    /// orders:
    ///   - id (integer(32), nullable: NO)
    /// ```
    pub fn format_for_summary(&self) -> String {
        let column_lines = self
            .columns
            .iter()
            .map(ColumnDescriptor::format_for_summary)
            .collect::<Vec<_>>()
            .join("");

        format!("\n{}:\n{}", self.name, column_lines)
    }
}

/// One row of information_schema.columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Data type as reported by information_schema.
    pub data_type: String,

    /// Maximum character length, for character types.
    pub max_length: Option<i64>,

    /// Numeric precision, for numeric types.
    pub numeric_precision: Option<i64>,

    /// Numeric scale, for numeric types.
    pub numeric_scale: Option<i64>,

    /// Nullability as the database reports it (`YES` or `NO`).
    pub is_nullable: String,

    /// Default expression, if any.
    pub default: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a column descriptor with only a name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: "YES".to_string(),
            ..Self::default()
        }
    }

    /// Reads every row of a describe-table result.
    ///
    /// Columns are looked up by name, so extra or reordered columns in the
    /// result are tolerated.
    pub fn from_result(result: &QueryResult) -> Vec<Self> {
        (0..result.rows.len())
            .map(|i| {
                let text = |col: &str| result.get(i, col).and_then(value_to_text);
                let number = |col: &str| result.get(i, col).and_then(value_to_i64);
                Self {
                    name: text("column_name").unwrap_or_default(),
                    data_type: text("data_type").unwrap_or_default(),
                    max_length: number("character_maximum_length"),
                    numeric_precision: number("numeric_precision"),
                    numeric_scale: number("numeric_scale"),
                    is_nullable: text("is_nullable").unwrap_or_default(),
                    default: text("column_default").filter(|d| !d.is_empty()),
                }
            })
            .collect()
    }

    /// Returns the type with its length or precision/scale suffix.
    ///
    /// Length wins when present and non-zero; otherwise precision is used,
    /// with the scale appended only when it is non-zero.
    pub fn type_with_size(&self) -> String {
        let present = |v: Option<i64>| v.filter(|n| *n != 0);

        if let Some(len) = present(self.max_length) {
            format!("{}({})", self.data_type, len)
        } else if let Some(precision) = present(self.numeric_precision) {
            match present(self.numeric_scale) {
                Some(scale) => format!("{}({},{})", self.data_type, precision, scale),
                None => format!("{}({})", self.data_type, precision),
            }
        } else {
            self.data_type.clone()
        }
    }

    /// Formats the column line of the schema summary.
    pub fn format_for_summary(&self) -> String {
        match &self.default {
            Some(default) => format!(
                "  - {} ({}, nullable: {}, default: {})\n",
                self.name,
                self.type_with_size(),
                self.is_nullable,
                default
            ),
            None => format!(
                "  - {} ({}, nullable: {})\n",
                self.name,
                self.type_with_size(),
                self.is_nullable
            ),
        }
    }
}

/// Formats one schema block: a header followed by each table block.
pub fn format_schema_block(schema: &str, tables: &[TableDescriptor]) -> String {
    let table_blocks = tables
        .iter()
        .map(TableDescriptor::format_for_summary)
        .collect::<Vec<_>>()
        .join("");

    format!("Schema: {}\nTables:\n{}", schema, table_blocks)
}

/// Returns the reference text for the Redshift performance views.
pub fn system_tables_reference() -> String {
    let blocks = SYSTEM_TABLES
        .iter()
        .map(|(table, columns)| {
            let lines = columns
                .iter()
                .map(|c| format!("  - {}\n", c))
                .collect::<Vec<_>>()
                .join("");
            format!("\n{}:\n{}", table, lines)
        })
        .collect::<Vec<_>>()
        .join("");

    format!("{}\n{}", SYSTEM_TABLES_HEADER, blocks)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_display_string()),
    }
}

// information_schema reports cardinal numbers as integers, but some drivers
// hand them back as numeric text.
fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Decimal(s) | Value::String(s) => s.trim().parse().ok(),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}
