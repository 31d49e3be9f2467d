//! estat-table: nested pages → flat tables
//!
//! Resolves classification codes to labels, persists one CSV artifact per
//! dataset under `data-cache/`, and encodes tables as `csv`, `rjson` or
//! `cjson`.

mod builder;
mod codebook;
mod output;
mod table;

pub use builder::{build_table, ensure_table};
pub use codebook::CodeBook;
pub use output::{Format, columns_json, encode, is_value_column, rows_json};
pub use table::{Frame, PREVIEW_ROWS, Table, View};
