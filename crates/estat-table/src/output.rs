//! Output encodings: `csv`, `rjson` (row objects), `cjson` (column arrays)

use std::str::FromStr;

use serde_json::{Map, Number, Value};

use estat_core::{EstatError, Result};

use crate::table::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    /// `[{"col": cell, ..}, ..]`
    RowJson,
    /// `{"col": [cell, ..], ..}`
    ColumnJson,
}

impl FromStr for Format {
    type Err = EstatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Self::Csv),
            "rjson" => Ok(Self::RowJson),
            "cjson" => Ok(Self::ColumnJson),
            _ => Err(EstatError::validation("Oops! check your extension!")),
        }
    }
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::RowJson => "rjson",
            Self::ColumnJson => "cjson",
        }
    }

    /// Content type to serve the encoded body with.
    pub fn content_type(self, download: bool) -> &'static str {
        match (self, download) {
            (_, true) => "application/octet-stream",
            (Self::Csv, false) => "text/plain",
            (_, false) => "application/json",
        }
    }
}

/// `$` alone, or `$` followed by a dataset id.
pub fn is_value_column(header: &str) -> bool {
    match header.strip_prefix('$') {
        Some(rest) => rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// JSON value of one cell. Cells of value columns become numbers; empty or
/// unparseable ones (`-`, `***`, `x`) become `null`.
fn json_cell(cell: &str, numeric: bool) -> Value {
    if !numeric {
        return Value::String(cell.to_string());
    }
    cell.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

pub fn encode(frame: &Frame, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Csv => frame.to_csv(),
        Format::RowJson => to_json(&rows_json(frame)),
        Format::ColumnJson => to_json(&columns_json(frame)),
    }
}

fn to_json(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| EstatError::from(std::io::Error::from(e)))
}

/// One object per row, keys in header order.
pub fn rows_json(frame: &Frame) -> Value {
    let numeric: Vec<bool> = frame.header.iter().map(|h| is_value_column(h)).collect();
    let rows = frame
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = frame
                .header
                .iter()
                .zip(&numeric)
                .enumerate()
                .map(|(i, (h, &num))| {
                    let cell = row.get(i).map_or("", String::as_str);
                    (h.clone(), json_cell(cell, num))
                })
                .collect();
            Value::Object(obj)
        })
        .collect();
    Value::Array(rows)
}

/// One array per column, keys in header order.
pub fn columns_json(frame: &Frame) -> Value {
    let obj: Map<String, Value> = frame
        .header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let numeric = is_value_column(h);
            let cells = frame.column(i).map(|c| json_cell(c, numeric)).collect();
            (h.clone(), Value::Array(cells))
        })
        .collect();
    Value::Object(obj)
}
