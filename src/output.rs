//! Rendering of results for the terminal.

use redshift_warden::db::QueryResult;
use serde::Serialize;

/// Formats a query result as an aligned text table followed by a row count.
pub fn format_result(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return format!("OK ({:.1} ms)", millis(result));
    }

    let headers: Vec<String> = result.column_names().into_iter().map(String::from).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let noun = if result.row_count == 1 { "row" } else { "rows" };
    format!(
        "{}\n({} {}, {:.1} ms)",
        format_table(&headers, &rows),
        result.row_count,
        noun,
        millis(result)
    )
}

fn millis(result: &QueryResult) -> f64 {
    result.execution_time.as_secs_f64() * 1000.0
}

/// Formats a table as a string for display.
pub fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let width_of = |s: &str| s.chars().count();
    let mut widths: Vec<usize> = headers.iter().map(|h| width_of(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(width_of(cell));
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut output = String::new();
    output.push_str(&line(headers));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in rows {
        output.push_str(&line(row));
        output.push('\n');
    }

    output
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serializes `value` as pretty-printed JSON.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
