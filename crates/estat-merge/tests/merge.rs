use indicatif::ProgressBar;

use estat_core::{DatasetId, EstatError, Fetch, Layout, RequestContext, Result};
use estat_fetch::{FetchConfig, PageStore};
use estat_merge::{Aggregate, GroupBy, MergeConfig, merge, merge_tables};
use estat_table::Table;

fn table(codes: &[&str], rows: &[&[&str]]) -> Table {
    Table {
        header: codes.iter().map(|c| c.to_string()).collect(),
        codes: codes.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

fn id(s: &str) -> DatasetId {
    DatasetId::parse(s).unwrap()
}

fn group(cols: &str) -> GroupBy {
    cols.parse().unwrap()
}

fn config() -> MergeConfig {
    MergeConfig {
        memory_limit: "256MB".to_string(),
        threads: 1,
    }
}

fn num(cell: &str) -> f64 {
    cell.parse().unwrap()
}

#[test]
fn sum_of_two_datasets() {
    let tables = vec![
        (id("1"), table(&["group", "$"], &[&["x", "10"]])),
        (id("2"), table(&["group", "$"], &[&["x", "20"]])),
    ];
    let merged = merge_tables(&tables, &group("group"), Some(Aggregate::Sum), &config()).unwrap();
    assert_eq!(merged.header, vec!["group", "$1", "$2"]);
    assert_eq!(merged.rows.len(), 1);
    assert_eq!(merged.rows[0][0], "x");
    assert_eq!(num(&merged.rows[0][1]), 10.0);
    assert_eq!(num(&merged.rows[0][2]), 20.0);
}

#[test]
fn all_returns_tagged_union() {
    let tables = vec![
        (id("1"), table(&["area", "$"], &[&["a", "1"], &["b", "2"]])),
        (id("2"), table(&["area", "unit", "$"], &[&["a", "人", "3"]])),
    ];
    let merged = merge_tables(&tables, &GroupBy::All, Some(Aggregate::Sum), &config()).unwrap();
    assert_eq!(merged.header, vec!["area", "$1", "source-id", "unit", "$2"]);
    assert_eq!(merged.rows.len(), 3);
    assert_eq!(merged.rows[0], vec!["a", "1", "1", "", ""]);
    assert_eq!(merged.rows[2], vec!["a", "", "2", "人", "3"]);
}

#[test]
fn groups_sorted_and_empty_keys_dropped() {
    let tables = vec![(
        id("1"),
        table(
            &["area", "$"],
            &[&["b", "1"], &["a", "2"], &["", "100"], &["b", "3"]],
        ),
    )];
    let merged = merge_tables(&tables, &group("area"), Some(Aggregate::Sum), &config()).unwrap();
    let keys: Vec<&str> = merged.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(num(&merged.rows[1][1]), 4.0);
}

#[test]
fn non_numeric_cells_ignored() {
    let tables = vec![(
        id("1"),
        table(&["g", "$"], &[&["x", "1"], &["x", "-"], &["x", "***"], &["x", "5"]]),
    )];
    let cfg = config();
    let mean = merge_tables(&tables, &group("g"), Some(Aggregate::Mean), &cfg).unwrap();
    assert_eq!(num(&mean.rows[0][1]), 3.0);

    let max = merge_tables(&tables, &group("g"), Some(Aggregate::Max), &cfg).unwrap();
    assert_eq!(num(&max.rows[0][1]), 5.0);

    // count counts non-empty cells, numeric or not
    let count = merge_tables(&tables, &group("g"), Some(Aggregate::Count), &cfg).unwrap();
    assert_eq!(num(&count.rows[0][1]), 4.0);
}

#[test]
fn sample_variance_and_median() {
    let tables = vec![(
        id("1"),
        table(&["g", "$"], &[&["x", "2"], &["x", "4"], &["x", "9"]]),
    )];
    let cfg = config();
    let var = merge_tables(&tables, &group("g"), Some(Aggregate::Var), &cfg).unwrap();
    // mean 5, squared deviations 9 + 1 + 16, n - 1 = 2
    assert!((num(&var.rows[0][1]) - 13.0).abs() < 1e-9);

    let std = merge_tables(&tables, &group("g"), Some(Aggregate::Std), &cfg).unwrap();
    assert!((num(&std.rows[0][1]) - 13.0_f64.sqrt()).abs() < 1e-9);

    let median = merge_tables(&tables, &group("g"), Some(Aggregate::Median), &cfg).unwrap();
    assert_eq!(num(&median.rows[0][1]), 4.0);

    let min = merge_tables(&tables, &group("g"), Some(Aggregate::Min), &cfg).unwrap();
    assert_eq!(num(&min.rows[0][1]), 2.0);
}

#[test]
fn multi_column_grouping() {
    let tables = vec![(
        id("1"),
        table(
            &["area", "time", "$"],
            &[&["a", "2020", "1"], &["a", "2021", "2"], &["a", "2020", "3"]],
        ),
    )];
    let merged =
        merge_tables(&tables, &group("area,time"), Some(Aggregate::Sum), &config()).unwrap();
    assert_eq!(merged.header, vec!["area", "time", "$1"]);
    assert_eq!(merged.rows.len(), 2);
    assert_eq!(merged.rows[0][1], "2020");
    assert_eq!(num(&merged.rows[0][2]), 4.0);
}

#[test]
fn empty_aggregate_projects_without_reduction() {
    let tables = vec![
        (id("1"), table(&["area", "unit", "$"], &[&["a", "人", "1"], &["a", "人", "2"]])),
        (id("2"), table(&["area", "unit", "$"], &[&["a", "人", "3"]])),
    ];
    let merged = merge_tables(&tables, &group("area"), None, &config()).unwrap();
    assert_eq!(merged.header, vec!["area", "$1", "$2"]);
    assert_eq!(merged.rows.len(), 3);
    assert_eq!(merged.rows[2], vec!["a", "", "3"]);
}

#[test]
fn unknown_group_column() {
    let tables = vec![(id("1"), table(&["area", "$"], &[&["a", "1"]]))];
    let err = merge_tables(&tables, &group("region"), Some(Aggregate::Sum), &config()).unwrap_err();
    assert!(err.is_validation());
}

/// Fails every request; merges must be served from table artifacts.
struct Offline;

impl Fetch for Offline {
    fn get(&self, _url: &str) -> Result<Vec<u8>> {
        Err(EstatError::upstream("offline"))
    }
}

fn offline_store() -> (tempfile::TempDir, PageStore<Offline>) {
    let dir = tempfile::tempdir().unwrap();
    let store = PageStore::new(Layout::new(dir.path()), FetchConfig::default(), Offline).unwrap();
    (dir, store)
}

#[test]
fn merge_reads_table_artifacts() {
    let (_dir, store) = offline_store();
    let layout = store.layout();
    table(&["group", "$"], &[&["x", "10"]])
        .write(&layout.table_path(&id("0001")))
        .unwrap();
    table(&["group", "$"], &[&["x", "20"]])
        .write(&layout.table_path(&id("0002")))
        .unwrap();

    let ctx = RequestContext::new("app").unwrap();
    let merged = merge(
        &store,
        &ctx,
        "0001, 0002",
        "group",
        "sum",
        &config(),
        &ProgressBar::hidden(),
    )
    .unwrap();
    assert_eq!(merged.header, vec!["group", "$0001", "$0002"]);
    assert_eq!(num(&merged.rows[0][1]), 10.0);
    assert_eq!(num(&merged.rows[0][2]), 20.0);
}

#[test]
fn arguments_validated_before_io() {
    let (_dir, store) = offline_store();
    let ctx = RequestContext::new("app").unwrap();
    let pb = ProgressBar::hidden();

    let err = merge(&store, &ctx, "0001,abc", "all", "", &config(), &pb).unwrap_err();
    assert!(err.is_validation());

    let err = merge(&store, &ctx, "0001", "area", "average", &config(), &pb).unwrap_err();
    assert!(matches!(err, EstatError::Aggregation(_)));
}

#[test]
fn missing_table_triggers_fetch() {
    let (_dir, store) = offline_store();
    let ctx = RequestContext::new("app").unwrap();
    let err = merge(
        &store,
        &ctx,
        "0001",
        "all",
        "",
        &config(),
        &ProgressBar::hidden(),
    )
    .unwrap_err();
    assert!(matches!(err, EstatError::Upstream { .. }));
}
