//! Dataset catalog (`getStatsList`) download and parsing

use std::fs;

use serde::Deserialize;

use estat_core::{DatasetId, EstatError, Fetch, Layout, RequestContext, Result, write_atomic};

use crate::api::ApiConfig;
use crate::schema::{ApiResult, OneOrMany, Scalar, Text};

#[derive(Debug, Deserialize)]
struct StatsListResponse {
    #[serde(rename = "GET_STATS_LIST")]
    body: StatsList,
}

#[derive(Debug, Deserialize)]
struct StatsList {
    #[serde(rename = "RESULT")]
    result: Option<ApiResult>,
    #[serde(rename = "DATALIST_INF", default)]
    datalist_inf: DataListInf,
}

#[derive(Debug, Default, Deserialize)]
struct DataListInf {
    #[serde(rename = "TABLE_INF", default)]
    table_inf: OneOrMany<CatalogEntry>,
}

/// One `TABLE_INF` record. Every field is optional on the wire; the indexer
/// skips entries missing the ones it needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "STAT_NAME")]
    pub stat_name: Option<Text>,
    #[serde(rename = "SURVEY_DATE")]
    pub survey_date: Option<Scalar>,
    #[serde(rename = "GOV_ORG")]
    pub gov_org: Option<Text>,
    #[serde(rename = "MAIN_CATEGORY")]
    pub main_category: Option<Text>,
    #[serde(rename = "SUB_CATEGORY")]
    pub sub_category: Option<Text>,
    #[serde(rename = "STATISTICS_NAME")]
    pub statistics_name: Option<Text>,
    #[serde(rename = "TITLE")]
    pub title: Option<Text>,
}

/// Descriptive fields every index artifact is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryKey {
    pub id: DatasetId,
    pub stat_name: String,
    pub survey_date: String,
    pub gov_org: String,
    pub main_category: String,
    pub sub_category: String,
}

impl CatalogEntry {
    /// The descriptive key, or the name of the first missing field.
    pub fn key(&self) -> std::result::Result<EntryKey, &'static str> {
        let id = self.id.as_deref().ok_or("@id")?;
        let id = DatasetId::parse(id).map_err(|_| "@id")?;
        Ok(EntryKey {
            id,
            stat_name: self.stat_name.as_ref().ok_or("STAT_NAME")?.value(),
            survey_date: self.survey_date.as_ref().ok_or("SURVEY_DATE")?.to_string(),
            gov_org: self.gov_org.as_ref().ok_or("GOV_ORG")?.value(),
            main_category: self.main_category.as_ref().ok_or("MAIN_CATEGORY")?.value(),
            sub_category: self.sub_category.as_ref().ok_or("SUB_CATEGORY")?.value(),
        })
    }

    pub fn statistics_name(&self) -> String {
        self.statistics_name
            .as_ref()
            .map(Text::value)
            .unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.title.as_ref().map(Text::value).unwrap_or_default()
    }
}

/// Parse a `getStatsList` body into catalog entries.
pub fn parse_catalog(body: &[u8]) -> Result<Vec<CatalogEntry>> {
    let resp: StatsListResponse = serde_json::from_slice(body)
        .map_err(|e| EstatError::upstream(format!("malformed catalog: {e}")))?;
    if let Some(result) = &resp.body.result {
        result.check()?;
    }
    Ok(resp.body.datalist_inf.table_inf.into_vec())
}

/// Download the full catalog to `dictionary/all.json.dic`.
///
/// The body is validated before it replaces the previous catalog. Returns the
/// number of entries.
pub fn download_catalog(
    fetcher: &impl Fetch,
    api: &ApiConfig,
    ctx: &RequestContext,
    layout: &Layout,
) -> Result<usize> {
    layout.ensure()?;
    log::info!("Downloading all statistics IDs");
    let body = fetcher.get(&api.list_url(ctx))?;
    let count = parse_catalog(&body)?.len();

    let path = layout.catalog_json();
    write_atomic(&path, &body)?;
    log::info!("Saved {count} catalog entries to {}", path.display());
    Ok(count)
}

/// Load the previously downloaded catalog.
pub fn load_catalog(layout: &Layout) -> Result<Vec<CatalogEntry>> {
    let path = layout.catalog_json();
    if !path.exists() {
        return Err(EstatError::missing(format!(
            "catalog not downloaded: {}",
            path.display()
        )));
    }
    let body = fs::read(&path).map_err(|e| EstatError::io(&path, e))?;
    parse_catalog(&body)
}

/// Download the statistics-center CSV index verbatim. Returns its size in bytes.
pub fn download_stat_center_index(
    fetcher: &impl Fetch,
    api: &ApiConfig,
    layout: &Layout,
) -> Result<usize> {
    layout.ensure()?;
    log::info!("Downloading stat center index from: {}", api.stat_center_url);
    let body = fetcher.get(&api.stat_center_url)?;
    write_atomic(&layout.stat_center_index(), &body)?;
    log::info!("Stat center index downloaded ({} bytes)", body.len());
    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
      "GET_STATS_LIST": {
        "RESULT": {"STATUS": 0, "ERROR_MSG": ""},
        "DATALIST_INF": {
          "NUMBER": 2,
          "TABLE_INF": [
            {
              "@id": "0003109558",
              "STAT_NAME": {"@code": "00200524", "$": "人口推計"},
              "GOV_ORG": {"@code": "00200", "$": "総務省"},
              "STATISTICS_NAME": "人口推計 長期時系列データ",
              "TITLE": {"@no": "1", "$": "年齢(各歳),男女別人口"},
              "SURVEY_DATE": 0,
              "MAIN_CATEGORY": {"@code": "02", "$": "人口・世帯"},
              "SUB_CATEGORY": {"@code": "01", "$": "人口"}
            },
            {
              "@id": "0003000001",
              "STAT_NAME": {"@code": "1", "$": "x"},
              "TITLE": "plain title"
            }
          ]
        }
      }
    }"#;

    #[test]
    fn parses_entries() {
        let entries = parse_catalog(CATALOG.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        let key = entries[0].key().unwrap();
        assert_eq!(key.id.as_str(), "0003109558");
        assert_eq!(key.stat_name, "人口推計");
        assert_eq!(key.survey_date, "0");
        assert_eq!(key.sub_category, "人口");
        assert_eq!(entries[0].title(), "年齢(各歳),男女別人口");
    }

    #[test]
    fn missing_field_reported() {
        let entries = parse_catalog(CATALOG.as_bytes()).unwrap();
        assert_eq!(entries[1].key().unwrap_err(), "SURVEY_DATE");
        assert_eq!(entries[1].title(), "plain title");
        assert_eq!(entries[1].statistics_name(), "");
    }

    #[test]
    fn single_table_inf_object() {
        let body = r#"{"GET_STATS_LIST":{"DATALIST_INF":{"TABLE_INF":{"@id":"1"}}}}"#;
        assert_eq!(parse_catalog(body.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn load_without_download_is_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&Layout::new(dir.path())).unwrap_err();
        assert!(matches!(err, EstatError::MissingData(_)));
    }
}
