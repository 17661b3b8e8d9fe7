//! Data export serialization and file output.
//!
//! Charts describe their export as a [`Table`]; this module turns it into CSV
//! or TSV text (with formula-injection guarding) and writes exports to disk.

use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{ChartError, Result};
use crate::viz::types::DataFormat;
use crate::viz::util::format_plain;

/// One exported value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Cell::Empty, Cell::Number)
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        v.map_or(Cell::Empty, Cell::Text)
    }
}

/// How text cells are quoted in delimited output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quoting {
    /// Only when the value needs it.
    #[default]
    Necessary,
    /// Every text cell; numbers stay bare (`"A",60`).
    Text,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub quoting: Quoting,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            quoting: Quoting::Necessary,
        }
    }

    pub fn quote_text(mut self) -> Self {
        self.quoting = Quoting::Text;
        self
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Prefix values a spreadsheet would evaluate as a formula.
///
/// Cells starting with `=`, `+`, `@`, tab or carriage return are prefixed with
/// `'`; so is `-` unless a digit or `.` follows (negative numbers stay intact).
pub fn sanitize_cell(value: &str) -> Cow<'_, str> {
    let mut chars = value.chars();
    let risky = match chars.next() {
        Some('=' | '+' | '@' | '\t' | '\r') => true,
        Some('-') => !matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '.'),
        _ => false,
    };
    if risky {
        Cow::Owned(format!("'{value}"))
    } else {
        Cow::Borrowed(value)
    }
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => sanitize_cell(s).into_owned(),
        Cell::Number(v) => format_plain(*v),
        Cell::Empty => String::new(),
    }
}

/// Serialize `table` as CSV or TSV. Rows end in `\n`; the last row has no trailing newline.
pub fn to_delimited(table: &Table, format: DataFormat) -> Result<String> {
    let delimiter = format.delimiter();
    let mut out = String::new();
    {
        let mut header = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .has_headers(false)
            .from_writer(Vec::new());
        header.write_record(table.header.iter().map(|h| sanitize_cell(h).into_owned()))?;
        out.push_str(&finish(header)?);
    }
    let style = match table.quoting {
        Quoting::Necessary => QuoteStyle::Necessary,
        Quoting::Text => QuoteStyle::NonNumeric,
    };
    let mut body = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(style)
        .has_headers(false)
        .from_writer(Vec::new());
    for row in &table.rows {
        body.write_record(row.iter().map(render_cell))?;
    }
    out.push_str(&finish(body)?);
    Ok(out.trim_end_matches('\n').to_string())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ChartError::Export(format!("flush delimited output: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ChartError::Export(e.to_string()))
}

/// Pretty JSON with two-space indentation.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a text export (JSON, CSV, TSV or SVG).
pub fn write_text<P: AsRef<Path>>(content: &str, path: P) -> Result<()> {
    write_bytes(content.as_bytes(), path)
}

/// Write an image export.
pub fn write_bytes<P: AsRef<Path>>(content: &[u8], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(content)?;
    f.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn categorical() -> Table {
        let mut t = Table::new(["label", "value"]).quote_text();
        t.push(vec!["A".into(), 60.0.into()]);
        t.push(vec!["B".into(), 30.0.into()]);
        t
    }

    #[test]
    fn text_quoting_leaves_numbers_bare() {
        let csv = to_delimited(&categorical(), DataFormat::Csv).unwrap();
        assert_eq!(csv, "label,value\n\"A\",60\n\"B\",30");
    }

    #[test]
    fn empty_cells_and_tsv() {
        let mut t = Table::new(["x", "s1", "s2"]);
        t.push(vec![1.0.into(), 10.0.into(), Cell::Empty]);
        assert_eq!(to_delimited(&t, DataFormat::Csv).unwrap(), "x,s1,s2\n1,10,");
        assert_eq!(to_delimited(&t, DataFormat::Tsv).unwrap(), "x\ts1\ts2\n1\t10\t");
    }

    #[test]
    fn formulas_are_neutralized() {
        assert_eq!(sanitize_cell("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(sanitize_cell("@cmd"), "'@cmd");
        assert_eq!(sanitize_cell("-x"), "'-x");
        assert_eq!(sanitize_cell("-12.5"), "-12.5");
        assert_eq!(sanitize_cell("read"), "read");
    }

    #[test]
    fn write_text_and_bytes() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let pngp = dir.path().join("x.png");
        write_text("label,value", &csvp).unwrap();
        write_bytes(&[0x89, b'P'], &pngp).unwrap();
        assert_eq!(std::fs::read_to_string(&csvp).unwrap(), "label,value");
        assert_eq!(std::fs::read(&pngp).unwrap().len(), 2);
    }

    #[test]
    fn json_is_indented_with_two_spaces() {
        let s = to_json(&serde_json::json!([{"label": "A"}])).unwrap();
        assert!(s.contains("\n  {\n    \"label\""));
    }
}
