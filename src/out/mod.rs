use crate::inventory_core::FlatRow;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

pub mod csv;
pub mod table;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutFormat {
    Csv,
    Json,
    Table,
}

/// Cell text: strings as-is, numbers and booleans via their JSON text, null
/// as empty.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn emit<W: Write>(out: &mut W, format: OutFormat, header: &[String], rows: &[FlatRow]) -> Result<()> {
    match format {
        OutFormat::Csv => csv::write(out, header, rows)?,
        OutFormat::Table => table::write(out, header, rows)?,
        OutFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}
