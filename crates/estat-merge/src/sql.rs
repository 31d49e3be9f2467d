//! SQL generation for the merge step.
//!
//! Every column is loaded as VARCHAR with empty cells as NULL; numeric
//! aggregates cast with TRY_CAST so non-numeric cells (`-`, `***`) drop out
//! instead of failing the query.

use crate::config::Aggregate;

/// Name of the in-memory table holding the union.
pub const MERGED: &str = "merged";

/// Double-quoted identifier; column names come from upstream and may hold
/// `$`, `-` or quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn configure(memory_limit: &str, threads: usize) -> String {
    format!(
        "SET memory_limit = '{}';
         SET threads = {threads};",
        memory_limit.replace('\'', "''")
    )
}

pub fn create_merged(columns: &[String]) -> String {
    let cols: Vec<String> = columns
        .iter()
        .map(|c| format!("{} VARCHAR", quote_ident(c)))
        .collect();
    format!("CREATE TABLE {MERGED} ({})", cols.join(", "))
}

pub fn insert_merged(width: usize) -> String {
    let params = vec!["?"; width].join(", ");
    format!("INSERT INTO {MERGED} VALUES ({params})")
}

fn reduce(agg: Aggregate, column: &str) -> String {
    let col = quote_ident(column);
    let num = format!("TRY_CAST({col} AS DOUBLE)");
    let expr = match agg {
        Aggregate::Sum => format!("SUM({num})"),
        Aggregate::Min => format!("MIN({num})"),
        Aggregate::Max => format!("MAX({num})"),
        Aggregate::Median => format!("MEDIAN({num})"),
        Aggregate::Count => format!("COUNT({col})"),
        Aggregate::Var => format!("VAR_SAMP({num})"),
        Aggregate::Std => format!("STDDEV_SAMP({num})"),
        Aggregate::Mean => format!("AVG({num})"),
    };
    format!("CAST({expr} AS DOUBLE) AS {col}")
}

/// Grouping columns, then one reduced value per value column.
///
/// Groups with a NULL (empty) key are dropped and groups come out sorted by
/// key, matching a dataframe group-by.
pub fn aggregate(group: &[String], values: &[String], agg: Aggregate) -> String {
    let keys: Vec<String> = group.iter().map(|g| quote_ident(g)).collect();
    let select: Vec<String> = keys
        .iter()
        .cloned()
        .chain(values.iter().map(|v| reduce(agg, v)))
        .collect();
    let not_null: Vec<String> = keys.iter().map(|k| format!("{k} IS NOT NULL")).collect();
    format!(
        "SELECT {} FROM {MERGED} WHERE {} GROUP BY {} ORDER BY {}",
        select.join(", "),
        not_null.join(" AND "),
        keys.join(", "),
        keys.join(", "),
    )
}
