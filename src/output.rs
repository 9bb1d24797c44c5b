//! Row writers for the `scan` command.

use std::io::Write;

use clap::ValueEnum;
use gitsql_core::{RowIter, Schema, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per row, keyed by column name in schema order
    #[default]
    Json,
    /// Tab separated values with a header line. Tabs, newlines and
    /// backslashes inside values are backslash-escaped.
    Tsv,
}

/// Drains `rows` into `out` and closes the stream. Returns the number of
/// rows written.
pub fn write_rows<W, I>(
    out: &mut W,
    schema: &Schema,
    rows: &mut I,
    format: OutputFormat,
) -> anyhow::Result<usize>
where
    W: Write,
    I: RowIter + ?Sized,
{
    let result = write_all(out, schema, rows, format);
    let closed = rows.close();
    let count = result?;
    closed?;
    out.flush()?;
    Ok(count)
}

fn write_all<W, I>(
    out: &mut W,
    schema: &Schema,
    rows: &mut I,
    format: OutputFormat,
) -> anyhow::Result<usize>
where
    W: Write,
    I: RowIter + ?Sized,
{
    if format == OutputFormat::Tsv {
        let header: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        writeln!(out, "{}", header.join("\t"))?;
    }

    let mut count = 0;
    while let Some(row) = rows.next() {
        let row = row?;
        match format {
            OutputFormat::Json => {
                let obj: serde_json::Map<String, serde_json::Value> = schema
                    .iter()
                    .zip(&row)
                    .map(|(col, v)| serde_json::to_value(v).map(|v| (col.name.clone(), v)))
                    .collect::<Result<_, serde_json::Error>>()?;
                writeln!(out, "{}", serde_json::to_string(&obj)?)?;
            }
            OutputFormat::Tsv => {
                let fields: Vec<String> = row.iter().map(tsv_field).collect();
                writeln!(out, "{}", fields.join("\t"))?;
            }
        }
        count += 1;
    }
    Ok(count)
}

fn tsv_field(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Text(s) => escape_tsv(s),
        other => other.to_string(),
    }
}

/// Backslash escapes for the characters that would break a TSV line.
fn escape_tsv(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}
