//! `estat.toml`: API endpoint, storage root, HTTP and merge settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use estat_core::HttpConfig;
use estat_fetch::{ApiConfig, FetchConfig};
use estat_merge::MergeConfig;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub storage: StorageConfig,
    pub http: HttpSection,
    pub merge: MergeSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Client id; `${VAR}` reads it from the environment
    #[serde(deserialize_with = "deserialize_env_var")]
    pub app_id: Option<String>,
    pub host: String,
    pub version: String,
    /// Records per page
    pub limit: u32,
    /// Follow `NEXT_KEY` until the last page
    pub follow_next_key: bool,
    pub max_pages: usize,
    pub stat_center_url: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        let api = ApiConfig::default();
        let fetch = FetchConfig::default();
        Self {
            app_id: std::env::var("ESTAT_APP_ID").ok(),
            host: api.host,
            version: api.version,
            limit: api.limit,
            follow_next_key: fetch.follow_next_key,
            max_pages: fetch.max_pages,
            stat_center_url: api.stat_center_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of `tmp/`, `data-cache/` and `dictionary/`
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./estat-data"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Seconds per request
    pub request_timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpSection {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            request_timeout: http.request_timeout.as_secs(),
            max_retries: http.max_retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeSection {
    /// DuckDB memory limit (e.g. "1GB")
    pub memory_limit: String,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            memory_limit: MergeConfig::default().memory_limit,
        }
    }
}

/// `app_id = "${ESTAT_APP_ID}"` reads the id from the environment.
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| expand_env_var(&value)))
}

/// `${NAME}` becomes the value of `NAME`, or `None` when it is unset or empty.
/// Anything else is taken literally.
fn expand_env_var(value: &str) -> Option<String> {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => std::env::var(name).ok().filter(|v| !v.is_empty()),
        None => Some(value.to_owned()),
    }
}

impl Config {
    /// `./estat.toml`, else `config.toml` in the user config dir, else
    /// built-in defaults.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("estat.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "estat") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("no estat.toml found; built-in defaults apply");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config = toml::from_str::<Config>(&text)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        log::info!("Using config {}", path.display());
        Ok(config)
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            request_timeout: Duration::from_secs(self.http.request_timeout),
            max_retries: self.http.max_retries,
            ..HttpConfig::default()
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            api: ApiConfig {
                host: self.api.host.clone(),
                version: self.api.version.clone(),
                limit: self.api.limit,
                stat_center_url: self.api.stat_center_url.clone(),
            },
            follow_next_key: self.api.follow_next_key,
            max_pages: self.api.max_pages,
        }
    }

    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            memory_limit: self.merge.memory_limit.clone(),
            ..MergeConfig::default()
        }
    }
}
