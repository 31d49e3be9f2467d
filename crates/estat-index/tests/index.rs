use indicatif::ProgressBar;

use estat_core::{EstatError, Layout};
use estat_fetch::parse_catalog;
use estat_index::{
    build_catalog_index, index_catalog, record_user_index, search, search_catalog, user_index,
};

const CATALOG: &str = r#"{
  "GET_STATS_LIST": {
    "RESULT": {"STATUS": 0},
    "DATALIST_INF": {
      "TABLE_INF": [
        {
          "@id": "0003109558",
          "STAT_NAME": {"@code": "00200524", "$": "人口推計"},
          "GOV_ORG": {"@code": "00200", "$": "総務省"},
          "STATISTICS_NAME": "東京都統計",
          "TITLE": {"@no": "1", "$": "年齢(各歳)"},
          "SURVEY_DATE": 0,
          "MAIN_CATEGORY": {"@code": "02", "$": "人口・世帯"},
          "SUB_CATEGORY": {"@code": "01", "$": "人口"}
        },
        {
          "@id": "0003000002",
          "STAT_NAME": {"@code": "00200561", "$": "家計調査"},
          "GOV_ORG": {"@code": "00200", "$": "総務省"},
          "STATISTICS_NAME": "家計収支",
          "TITLE": "東京都区部",
          "SURVEY_DATE": "201001-201012",
          "MAIN_CATEGORY": {"@code": "07", "$": "企業・家計・経済"},
          "SUB_CATEGORY": {"@code": "01", "$": "家計"}
        },
        {
          "@id": "0003000003",
          "STAT_NAME": {"@code": "1", "$": "不完全"}
        }
      ]
    }
  }
}"#;

fn indexed() -> (tempfile::TempDir, Layout) {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let entries = parse_catalog(CATALOG.as_bytes()).unwrap();
    let written = index_catalog(&layout, &entries, &ProgressBar::hidden()).unwrap();
    assert_eq!(written, 2);
    build_catalog_index(&layout, &entries).unwrap();
    (dir, layout)
}

#[test]
fn artifact_has_two_ngram_lines() {
    let (_dir, layout) = indexed();
    let path = layout
        .detail_dir()
        .join("0003109558-人口推計-0-総務省-人口・世帯-人口.dic");
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content, "東京,京都,都統,統計\n年齢,齢各,各歳");
}

#[test]
fn search_matches_line_substring() {
    let (_dir, layout) = indexed();
    let hits = search(&layout, "東京").unwrap();
    let ids: Vec<&str> = hits.iter().map(|m| m.id.as_str()).collect();
    // sorted by file name
    assert_eq!(ids, vec!["0003000002", "0003109558"]);
    assert!(hits.iter().all(|m| m.query == "東京"));
}

#[test]
fn search_single_line_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    layout.ensure().unwrap();
    std::fs::write(layout.detail_dir().join("42-x-0-y-z-w.dic"), "to,ok,ky").unwrap();

    let hits = search(&layout, "ok").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id.as_str(), "42");
    assert_eq!(hits[0].query, "ok");
}

#[test]
fn duplicate_lines_yield_duplicate_matches() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    layout.ensure().unwrap();
    std::fs::write(layout.detail_dir().join("7-a-b-c-d-e.dic"), "ab,bc\nab,bc").unwrap();
    assert_eq!(search(&layout, "ab").unwrap().len(), 2);
}

#[test]
fn unsafe_query_rejected() {
    let (_dir, layout) = indexed();
    for q in ["to;ok", "a&b", "a|b", "`x`", "$x", "a\nb", ""] {
        let err = search(&layout, q).unwrap_err();
        assert!(matches!(err, EstatError::Validation(_)), "{q:?}");
    }
}

#[test]
fn user_index_accumulates() {
    let (_dir, layout) = indexed();
    record_user_index(&layout, "東京").unwrap();
    record_user_index(&layout, "家計").unwrap();

    let frame = user_index(&layout).unwrap();
    assert_eq!(frame.header, vec!["statsDataId", "検索語"]);
    assert_eq!(
        frame.rows,
        vec![
            vec!["0003000002", "東京"],
            vec!["0003109558", "東京"],
            vec!["0003000002", "家計"],
        ]
    );
}

#[test]
fn user_index_absent_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let frame = user_index(&Layout::new(dir.path())).unwrap();
    assert!(frame.rows.is_empty());
}

#[test]
fn catalog_listing() {
    let (_dir, layout) = indexed();
    let all = search_catalog(&layout, "index").unwrap();
    assert_eq!(all.header.len(), 5);
    assert_eq!(all.rows.len(), 2);
    assert_eq!(
        all.rows[0],
        vec!["0003109558", "人口推計", "0", "総務省", "人口・世帯"]
    );
    assert_eq!(all.rows[1][2], "201001-201012");

    let some = search_catalog(&layout, "家計調査").unwrap();
    assert_eq!(some.rows.len(), 1);
    assert_eq!(some.rows[0][0], "0003000002");
}

#[test]
fn catalog_index_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = search_catalog(&Layout::new(dir.path()), "index").unwrap_err();
    assert!(matches!(err, EstatError::MissingData(_)));
}

#[test]
fn reindex_removes_stale_artifacts() {
    let (_dir, layout) = indexed();
    let stale = layout.detail_dir().join("99-old-0-x-y-z.dic");
    std::fs::write(&stale, "").unwrap();

    let entries = parse_catalog(CATALOG.as_bytes()).unwrap();
    index_catalog(&layout, &entries, &ProgressBar::hidden()).unwrap();
    assert!(!stale.exists());
    assert_eq!(search(&layout, "東京").unwrap().len(), 2);
}

#[test]
fn duplicate_catalog_entries_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let mut entries = parse_catalog(CATALOG.as_bytes()).unwrap();
    entries.extend(parse_catalog(CATALOG.as_bytes()).unwrap());

    let written = index_catalog(&layout, &entries, &ProgressBar::hidden()).unwrap();
    assert_eq!(written, 2);
    assert_eq!(build_catalog_index(&layout, &entries).unwrap(), 2);
    assert_eq!(std::fs::read_dir(layout.detail_dir()).unwrap().count(), 2);
}
