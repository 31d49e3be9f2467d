//! e-Stat REST endpoints

use estat_core::{Cursor, DatasetId, RequestContext, build_uri};

/// Where and how much to ask the upstream service for.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme and host, e.g. `https://api.e-stat.go.jp`
    pub host: String,
    /// API version path segment, e.g. `3.0`
    pub version: String,
    /// Records per page (`limit`)
    pub limit: u32,
    /// Statistics-center index download URL
    pub stat_center_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "https://api.e-stat.go.jp".to_string(),
            version: "3.0".to_string(),
            limit: 10_000,
            stat_center_url: "http://www.e-stat.go.jp/api/sample2/api-m/stat-center-index.csv"
                .to_string(),
        }
    }
}

impl ApiConfig {
    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/rest/{}/app/json/{method}",
            self.host.trim_end_matches('/'),
            self.version
        )
    }

    /// `getStatsData` URL for one page of a dataset.
    pub fn data_url(&self, ctx: &RequestContext, id: &DatasetId, cursor: &Cursor) -> String {
        let limit = self.limit.to_string();
        build_uri(
            &self.endpoint("getStatsData"),
            &[
                ("appId", ctx.app_id()),
                ("statsDataId", id.as_str()),
                ("limit", &limit),
                ("startPosition", cursor.as_str()),
            ],
        )
    }

    /// `getStatsList` URL for the full catalog.
    pub fn list_url(&self, ctx: &RequestContext) -> String {
        build_uri(
            &self.endpoint("getStatsList"),
            &[("appId", ctx.app_id()), ("searchWord", "")],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_template() {
        let api = ApiConfig {
            host: "http://api.e-stat.go.jp/".to_string(),
            version: "2.0".to_string(),
            limit: 100,
            ..Default::default()
        };
        let ctx = RequestContext::new("key").unwrap();
        let id = DatasetId::parse("0003109558").unwrap();
        assert_eq!(
            api.data_url(&ctx, &id, &Cursor::first()),
            "http://api.e-stat.go.jp/rest/2.0/app/json/getStatsData\
             ?appId=key&statsDataId=0003109558&limit=100&startPosition=1"
        );
    }

    #[test]
    fn list_url_template() {
        let ctx = RequestContext::new("key").unwrap();
        let url = ApiConfig::default().list_url(&ctx);
        assert_eq!(
            url,
            "https://api.e-stat.go.jp/rest/3.0/app/json/getStatsList?appId=key&searchWord="
        );
    }
}
