use std::io::{self, Write};

use super::render_scalar;
use crate::inventory_core::FlatRow;

/// Left-aligned columns separated by two spaces, with a dashed rule under the
/// header. Widths count characters, not bytes.
pub fn write<W: Write>(out: &mut W, header: &[String], rows: &[FlatRow]) -> io::Result<()> {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.values().map(render_scalar).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |fields: &[String]| -> String {
        let padded: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(f, &w)| format!("{f:<w$}"))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    writeln!(out, "{}", format_line(header))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for line in &cells {
        writeln!(out, "{}", format_line(line.as_slice()))?;
    }
    Ok(())
}
