//! RFC 4180 style CSV: comma separated, CRLF line endings, fields quoted only
//! when they contain a comma, quote or line break.

use std::borrow::Cow;
use std::io::{self, Write};

use super::render_scalar;
use crate::inventory_core::FlatRow;

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn write_line<W: Write, I, S>(out: &mut W, fields: I) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let line: Vec<String> = fields
        .into_iter()
        .map(|f| escape(f.as_ref()).into_owned())
        .collect();
    write!(out, "{}\r\n", line.join(","))
}

pub fn write<W: Write>(out: &mut W, header: &[String], rows: &[FlatRow]) -> io::Result<()> {
    write_line(out, header)?;
    for row in rows {
        write_line(out, row.values().map(render_scalar))?;
    }
    Ok(())
}
