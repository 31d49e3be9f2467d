//! Cached pages → flattened table

use std::fs;
use std::path::Path;

use indicatif::ProgressBar;
use rustc_hash::FxHashMap;
use serde_json::Value;

use estat_core::{Cursor, DatasetId, EstatError, Fetch, Layout, RequestContext, Result};
use estat_fetch::{PageStore, Record, StatsDataResponse};

use crate::codebook::CodeBook;
use crate::table::Table;

/// Marker the service puts in front of classification keys.
const AXIS_MARKER: char = '@';

/// Column set fixed by the first record of the first page.
struct Columns {
    names: Vec<String>,
    position: FxHashMap<String, usize>,
}

impl Columns {
    fn from_record(record: &Record) -> Self {
        let names: Vec<String> = record
            .keys()
            .map(|k| k.trim_start_matches(AXIS_MARKER).to_string())
            .collect();
        let position = record
            .keys()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        Self { names, position }
    }

    /// Place a record's cells by key name and resolve coded cells.
    fn flatten(&self, id: &DatasetId, record: &Record, book: &CodeBook) -> Result<Vec<String>> {
        let mut row = vec![String::new(); self.names.len()];
        for (key, value) in record {
            let Some(&i) = self.position.get(key) else {
                return Err(EstatError::SchemaMismatch {
                    dataset: id.to_string(),
                    column: key.clone(),
                });
            };
            let raw = cell(value);
            row[i] = book.resolve(&self.names[i], &raw).to_string();
        }
        Ok(row)
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Flatten every cached page of `id` and persist the table.
///
/// Pages are consumed in cursor order. The consumed pages are deleted
/// whether the build succeeds or not, so the next attempt refetches.
pub fn build_table(layout: &Layout, ctx: &RequestContext, id: &DatasetId) -> Result<Table> {
    let result = flatten_pages(layout, ctx, id).and_then(|table| {
        table.write(&layout.table_path(id))?;
        Ok(table)
    });

    let removed = layout.remove_pages(ctx, id);
    match &result {
        Ok(table) => log::info!(
            "{id}: built table with {} rows from {removed} page(s)",
            table.rows.len()
        ),
        Err(e) => log::error!("{id}: table build failed: {e}"),
    }
    result
}

fn flatten_pages(layout: &Layout, ctx: &RequestContext, id: &DatasetId) -> Result<Table> {
    let pages = layout.cached_pages(ctx, id);
    let Some(((cursor, path), rest)) = pages.split_first() else {
        return Err(EstatError::missing(format!("{id}: no cached pages")));
    };

    // header and codebook come from the first page only
    let first = read_page(id, cursor, path)?;
    let record = first
        .records()
        .first()
        .ok_or_else(|| EstatError::missing(format!("{id}: first page has no records")))?;
    let columns = Columns::from_record(record);
    let book = CodeBook::from_axes(first.axes());

    let mut rows = Vec::new();
    for record in first.records() {
        rows.push(columns.flatten(id, record, &book)?);
    }
    for (cursor, path) in rest {
        let page = read_page(id, cursor, path)?;
        for record in page.records() {
            rows.push(columns.flatten(id, record, &book)?);
        }
    }

    Ok(Table {
        header: columns
            .names
            .iter()
            .map(|c| book.header(c).to_string())
            .collect(),
        codes: columns.names,
        rows,
    })
}

fn read_page(id: &DatasetId, cursor: &Cursor, path: &Path) -> Result<StatsDataResponse> {
    let body = fs::read(path).map_err(|e| EstatError::io(path, e))?;
    let page = StatsDataResponse::parse(&body)?;
    log::debug!("{id}@{cursor}: {} record(s)", page.records().len());
    Ok(page)
}

/// Return the table of `id`, paginating and building it first if absent.
///
/// Concurrent callers for the same client and dataset wait for the one
/// building the table and then read its artifact.
pub fn ensure_table<F: Fetch>(
    store: &PageStore<F>,
    ctx: &RequestContext,
    id: &DatasetId,
    pb: &ProgressBar,
) -> Result<Table> {
    let path = store.layout().table_path(id);
    if path.exists() {
        log::debug!("{id}: using cached table");
        return Table::read(&path);
    }

    let _guard = store.lock_dataset(ctx, id);
    if path.exists() {
        log::debug!("{id}: table built by a concurrent request");
        return Table::read(&path);
    }
    store.paginate(ctx, id, pb)?;
    build_table(store.layout(), ctx, id)
}
