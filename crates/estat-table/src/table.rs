//! Flattened table and its CSV artifact

use std::path::Path;
use std::str::FromStr;

use estat_core::{EstatError, Result, write_atomic};

/// Rows kept by `head` / `tail`.
pub const PREVIEW_ROWS: usize = 5;

/// A flattened dataset as persisted under `data-cache/`.
///
/// `header` carries resolved axis names, `codes` the raw column names (the
/// stripped record keys). Both have the width of every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub codes: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A plain rectangular table: one header line and its rows.
///
/// This is what callers get back from views and merges, and what the output
/// encoders consume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Projection of a stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Every row
    Get,
    /// First five rows
    Head,
    /// Last five rows
    Tail,
}

impl FromStr for View {
    type Err = EstatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get" => Ok(Self::Get),
            "head" => Ok(Self::Head),
            "tail" => Ok(Self::Tail),
            other => Err(EstatError::validation(format!(
                "unknown command {other:?} (expected get, head or tail)"
            ))),
        }
    }
}

impl Table {
    pub fn width(&self) -> usize {
        self.codes.len()
    }

    /// The table without its raw-code row, cut down to `view`.
    pub fn view(&self, view: View) -> Frame {
        let rows = match view {
            View::Get => &self.rows[..],
            View::Head => &self.rows[..self.rows.len().min(PREVIEW_ROWS)],
            View::Tail => &self.rows[self.rows.len().saturating_sub(PREVIEW_ROWS)..],
        };
        Frame {
            header: self.header.clone(),
            rows: rows.to_vec(),
        }
    }

    /// Serialize as header line, raw-code line, then rows.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        write_csv(
            std::iter::once(&self.header)
                .chain(std::iter::once(&self.codes))
                .chain(&self.rows),
        )
    }

    /// Persist atomically; a failed write leaves any previous artifact intact.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_csv()?)
    }

    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut lines = read_csv(data)?.into_iter();
        let (Some(header), Some(codes)) = (lines.next(), lines.next()) else {
            return Err(EstatError::missing("table has no raw-code row"));
        };
        Ok(Self {
            header,
            codes,
            rows: lines.collect(),
        })
    }

    /// Load a table artifact.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EstatError::missing(format!("table not built: {}", path.display()))
            } else {
                EstatError::io(path, e)
            }
        })?;
        Self::from_csv(&data).map_err(|e| match e {
            EstatError::Io { path: None, source } => EstatError::io(path, source),
            other => other,
        })
    }
}

impl Frame {
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Header line then rows.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        write_csv(std::iter::once(&self.header).chain(&self.rows))
    }

    /// Cells of one column, in row order. Short rows yield empty cells.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map_or("", String::as_str))
    }
}

/// Numeric-looking cells unquoted, everything else quoted.
fn write_csv<'a>(lines: impl IntoIterator<Item = &'a Vec<String>>) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .flexible(true)
        .from_writer(Vec::new());
    for line in lines {
        writer.write_record(line).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| EstatError::from(e.into_error()))
}

fn read_csv(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    reader
        .records()
        .map(|r| {
            r.map(|rec| rec.iter().map(str::to_string).collect())
                .map_err(csv_error)
        })
        .collect()
}

fn csv_error(e: csv::Error) -> EstatError {
    EstatError::from(std::io::Error::from(e))
}
