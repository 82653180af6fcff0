//! Output formatting helpers for the `mpinstall` CLI.

use std::io::{self, Write};

use anyhow::{Context, Result};
use mpinstall_ui::styles::render_separator;
use serde::Serialize;

/// Prints `value` as pretty-printed JSON on stdout.
pub fn output_json<T: Serialize>(value: &T) -> Result<()> {
    write_json(&mut io::stdout().lock(), value)
}

/// Writes `value` as pretty JSON plus a newline. A closed pipe (`| head`)
/// is not an error.
fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize JSON output")?;
    match writeln!(out, "{json}") {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            Err(e).context("failed to write JSON output")
        }
        _ => Ok(()),
    }
}

/// Print a simple table with headers and rows.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = write!(handle, "{}", format_table(headers, rows, true));
}

/// Renders a table; column widths are computed from the data.
pub fn format_table(headers: &[&str], rows: &[Vec<String>], styled: bool) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let line = |cells: Vec<String>, out: &mut String| {
        let joined = cells.join("  ");
        out.push_str(joined.trim_end());
        out.push('\n');
    };

    line(
        headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| format!("{h:<w$}"))
            .collect(),
        &mut out,
    );
    line(
        widths
            .iter()
            .map(|w| {
                if styled {
                    render_separator(*w)
                } else {
                    "-".repeat(*w)
                }
            })
            .collect(),
        &mut out,
    );
    for row in rows {
        line(
            row.iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(&w) => format!("{cell:<w$}"),
                    None => cell.clone(),
                })
                .collect(),
            &mut out,
        );
    }
    out
}

/// Formats a byte count for humans (`12.3 MB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = u;
    }
    format!("{value:.1} {unit}")
}
