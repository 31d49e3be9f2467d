//! Serde types for the `getStatsData` and `getStatsList` JSON responses
//!
//! The service collapses one-element arrays into a bare object (`VALUE`,
//! `CLASS`, `CLASS_OBJ`, `TABLE_INF`), and emits some scalars as either
//! numbers or strings (`NEXT_KEY`, `SURVEY_DATE`, `STATUS`). [`OneOrMany`]
//! and [`Scalar`] absorb both shapes.

use serde::Deserialize;

use estat_core::{Cursor, EstatError, Result};

/// First status code the service uses for errors (0-2 are success variants).
const FIRST_ERROR_STATUS: i64 = 100;

/// One upstream record: ordered `@axis -> code` pairs plus `$ -> value`.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A list that the service may flatten to a single element.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(v) => v,
            Self::One(x) => vec![x],
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Many(v) => v,
            Self::One(x) => std::slice::from_ref(x),
        }
    }
}

/// A scalar sent as either a JSON number or a JSON string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A label sent either as a plain string or as `{"@code": .., "$": ..}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Tagged {
        #[serde(rename = "$", default)]
        value: String,
    },
    Number(serde_json::Number),
}

impl Text {
    pub fn value(&self) -> String {
        match self {
            Self::Plain(s) | Self::Tagged { value: s } => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// In-band result block present in every response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResult {
    #[serde(rename = "STATUS")]
    pub status: Scalar,
    #[serde(rename = "ERROR_MSG", default)]
    pub error_msg: String,
}

impl ApiResult {
    /// The service answers HTTP 200 even for errors; the status says otherwise.
    pub fn check(&self) -> Result<()> {
        let code: i64 = self.status.to_string().parse().unwrap_or(0);
        if code >= FIRST_ERROR_STATUS {
            return Err(EstatError::upstream(format!(
                "status {code}: {}",
                self.error_msg
            )));
        }
        Ok(())
    }
}

// ── getStatsData ──

#[derive(Debug, Clone, Deserialize)]
pub struct StatsDataResponse {
    #[serde(rename = "GET_STATS_DATA")]
    pub body: StatsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsData {
    #[serde(rename = "RESULT")]
    pub result: Option<ApiResult>,
    #[serde(rename = "STATISTICAL_DATA", default)]
    pub statistical_data: StatisticalData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticalData {
    #[serde(rename = "RESULT_INF", default)]
    pub result_inf: ResultInf,
    #[serde(rename = "CLASS_INF", default)]
    pub class_inf: ClassInf,
    #[serde(rename = "DATA_INF", default)]
    pub data_inf: DataInf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultInf {
    #[serde(rename = "NEXT_KEY")]
    pub next_key: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassInf {
    #[serde(rename = "CLASS_OBJ", default)]
    pub class_obj: OneOrMany<ClassObj>,
}

/// One classification axis (`@id` = column name once `@` is stripped).
#[derive(Debug, Clone, Deserialize)]
pub struct ClassObj {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "CLASS", default)]
    pub class: OneOrMany<ClassEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassEntry {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "@name", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataInf {
    #[serde(rename = "VALUE", default)]
    pub value: OneOrMany<Record>,
}

impl StatsDataResponse {
    /// Parse a full page and reject in-band errors.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let resp: Self = serde_json::from_slice(body)
            .map_err(|e| EstatError::upstream(format!("malformed response body: {e}")))?;
        if let Some(result) = &resp.body.result {
            result.check()?;
        }
        Ok(resp)
    }

    pub fn records(&self) -> &[Record] {
        self.body.statistical_data.data_inf.value.as_slice()
    }

    pub fn axes(&self) -> &[ClassObj] {
        self.body.statistical_data.class_inf.class_obj.as_slice()
    }
}

// Only the pagination fields; records are skipped without being built.
#[derive(Deserialize)]
struct PageSummary {
    #[serde(rename = "GET_STATS_DATA")]
    body: PageSummaryBody,
}

#[derive(Deserialize)]
struct PageSummaryBody {
    #[serde(rename = "RESULT")]
    result: Option<ApiResult>,
    #[serde(rename = "STATISTICAL_DATA")]
    statistical_data: Option<PageSummaryData>,
}

#[derive(Deserialize)]
struct PageSummaryData {
    #[serde(rename = "RESULT_INF", default)]
    result_inf: ResultInf,
}

/// Next cursor declared by a page, or [`Cursor::END`] when absent.
pub fn next_cursor(body: &[u8]) -> Result<Cursor> {
    let page: PageSummary = serde_json::from_slice(body)
        .map_err(|e| EstatError::upstream(format!("malformed response body: {e}")))?;
    if let Some(result) = &page.body.result {
        result.check()?;
    }
    match page
        .body
        .statistical_data
        .and_then(|d| d.result_inf.next_key)
    {
        Some(key) => Cursor::parse(&key.to_string()),
        None => Ok(Cursor::end()),
    }
}
