//! estat-merge: union of several datasets' tables with optional group-wise
//! aggregation
//!
//! Value columns are disambiguated by suffixing the owning dataset id
//! (`$` → `$0003109558`) and every row is tagged with a `source-id` column.
//! Aggregation runs in an in-memory DuckDB connection.

mod config;
mod sql;

pub use config::{Aggregate, GroupBy, MergeConfig};

use duckdb::Connection;
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;

use estat_core::{DatasetId, EstatError, Fetch, RequestContext, Result};
use estat_fetch::PageStore;
use estat_table::{Frame, Table, ensure_table};

/// Provenance column appended to every merged row.
pub const SOURCE_ID: &str = "source-id";

/// Marker of value columns.
const VALUE_MARKER: char = '$';

/// A merged table is a plain header + rows table.
pub type MergedTable = Frame;

fn is_value_column(name: &str) -> bool {
    name.contains(VALUE_MARKER)
}

fn query_error(e: duckdb::Error) -> EstatError {
    EstatError::Query(e.to_string())
}

/// Merge the datasets listed in `ids` (comma-separated).
///
/// Every argument is validated before any I/O. Datasets without a table
/// artifact are paginated and built first, one after another.
pub fn merge<F: Fetch>(
    store: &PageStore<F>,
    ctx: &RequestContext,
    ids: &str,
    group_by: &str,
    aggregate: &str,
    config: &MergeConfig,
    pb: &ProgressBar,
) -> Result<MergedTable> {
    let ids = DatasetId::parse_list(ids)?;
    let group_by: GroupBy = group_by.parse()?;
    let aggregate = Aggregate::parse_optional(aggregate)?;

    let mut tables = Vec::with_capacity(ids.len());
    for id in ids {
        pb.set_message(format!("loading {id}"));
        let table = ensure_table(store, ctx, &id, pb)?;
        tables.push((id, table));
    }
    merge_tables(&tables, &group_by, aggregate, config)
}

/// Union already-loaded tables, then group and reduce.
pub fn merge_tables(
    tables: &[(DatasetId, Table)],
    group_by: &GroupBy,
    aggregate: Option<Aggregate>,
    config: &MergeConfig,
) -> Result<MergedTable> {
    let union = union(tables.iter().map(|(id, table)| tag(id, table)));
    log::info!(
        "Merged {} table(s): {} rows, {} columns",
        tables.len(),
        union.rows.len(),
        union.width()
    );

    let group = match group_by {
        GroupBy::All => return Ok(union),
        GroupBy::Columns(group) => group,
    };
    if let Some(missing) = group.iter().find(|g| !union.header.contains(g)) {
        return Err(EstatError::validation(format!(
            "unknown group-by column: {missing:?}"
        )));
    }

    match aggregate {
        Some(agg) => reduce(&union, group, agg, config),
        None => Ok(project(&union, group)),
    }
}

/// Raw-code columns with value columns renamed after `id`, plus `source-id`.
fn tag(id: &DatasetId, table: &Table) -> Frame {
    let suffixed = format!("{VALUE_MARKER}{id}");
    let header = table
        .codes
        .iter()
        .map(|c| {
            if is_value_column(c) {
                c.replace(VALUE_MARKER, &suffixed)
            } else {
                c.clone()
            }
        })
        .chain(std::iter::once(SOURCE_ID.to_string()))
        .collect();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(table.width(), String::new());
            row.push(id.to_string());
            row
        })
        .collect();
    Frame { header, rows }
}

/// Row-wise union. Columns are ordered by first appearance; cells a table
/// does not have are empty.
fn union(frames: impl IntoIterator<Item = Frame>) -> Frame {
    let mut header: Vec<String> = Vec::new();
    let mut position: FxHashMap<String, usize> = FxHashMap::default();
    let mut parts = Vec::new();

    for frame in frames {
        let slots: Vec<usize> = frame
            .header
            .iter()
            .map(|name| {
                *position.entry(name.clone()).or_insert_with(|| {
                    header.push(name.clone());
                    header.len() - 1
                })
            })
            .collect();
        parts.push((slots, frame.rows));
    }

    let width = header.len();
    let rows = parts
        .into_iter()
        .flat_map(|(slots, rows)| {
            rows.into_iter().map(move |row| {
                let mut out = vec![String::new(); width];
                for (cell, &slot) in row.into_iter().zip(&slots) {
                    out[slot] = cell;
                }
                out
            })
        })
        .collect();
    Frame { header, rows }
}

/// No aggregate: grouping and value columns, every row kept.
fn project(frame: &Frame, group: &[String]) -> Frame {
    let keep: Vec<usize> = frame
        .header
        .iter()
        .enumerate()
        .filter(|(_, name)| is_value_column(name) || group.contains(name))
        .map(|(i, _)| i)
        .collect();
    Frame {
        header: keep.iter().map(|&i| frame.header[i].clone()).collect(),
        rows: frame
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect(),
    }
}

/// Group by `group` and reduce every value column with `agg`.
fn reduce(frame: &Frame, group: &[String], agg: Aggregate, config: &MergeConfig) -> Result<Frame> {
    let values: Vec<String> = frame
        .header
        .iter()
        .filter(|c| is_value_column(c) && !group.contains(c))
        .cloned()
        .collect();

    let mut conn = Connection::open_in_memory().map_err(query_error)?;
    conn.execute_batch(&sql::configure(&config.memory_limit, config.threads))
        .map_err(query_error)?;
    conn.execute_batch(&sql::create_merged(&frame.header))
        .map_err(query_error)?;

    let tx = conn.transaction().map_err(query_error)?;
    {
        let mut insert = tx
            .prepare(&sql::insert_merged(frame.width()))
            .map_err(query_error)?;
        for row in &frame.rows {
            let cells = row.iter().map(|c| (!c.is_empty()).then_some(c.as_str()));
            insert
                .execute(duckdb::params_from_iter(cells))
                .map_err(query_error)?;
        }
    }
    tx.commit().map_err(query_error)?;

    log::debug!("{} by {group:?} over {} value column(s)", agg.keyword(), values.len());
    let mut stmt = conn
        .prepare(&sql::aggregate(group, &values, agg))
        .map_err(query_error)?;
    let keys = group.len();
    let width = keys + values.len();
    let rows = stmt
        .query_map([], |row| {
            let mut out = Vec::with_capacity(width);
            for i in 0..keys {
                out.push(row.get::<_, Option<String>>(i)?.unwrap_or_default());
            }
            for i in keys..width {
                out.push(
                    row.get::<_, Option<f64>>(i)?
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            Ok(out)
        })
        .map_err(query_error)?
        .collect::<duckdb::Result<Vec<_>>>()
        .map_err(query_error)?;

    Ok(Frame {
        header: group.iter().chain(&values).cloned().collect(),
        rows,
    })
}
