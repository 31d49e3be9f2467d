pub mod catalog;
pub mod merge;
pub mod search;
pub mod table;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use estat_core::{HttpClient, Layout, RequestContext};
use estat_fetch::PageStore;
use estat_table::{Format, Frame, encode};

use crate::config::Config;

/// Encoding options shared by every command that prints a table.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output format: csv, rjson or cjson
    #[arg(short, long, default_value = "csv")]
    pub format: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl OutputArgs {
    /// Checked before any download or index write.
    pub fn format(&self) -> Result<Format> {
        Ok(self.format.parse()?)
    }
}

/// What every command needs: the directory layout, the page store and the
/// caller's client id.
pub struct Session {
    pub config: Config,
    pub store: PageStore<HttpClient>,
    app_id: Option<String>,
}

impl Session {
    pub fn new(config: Config, app_id: Option<String>) -> Result<Self> {
        let layout = Layout::new(&config.storage.root);
        let store = PageStore::new(
            layout,
            config.fetch_config(),
            HttpClient::new(config.http_config()),
        )
        .with_context(|| {
            format!(
                "Failed to prepare storage root: {}",
                config.storage.root.display()
            )
        })?;
        let app_id = app_id.or_else(|| config.api.app_id.clone());
        Ok(Self {
            config,
            store,
            app_id,
        })
    }

    pub fn layout(&self) -> &Layout {
        self.store.layout()
    }

    /// Context for commands that talk to the upstream service.
    pub fn context(&self) -> Result<RequestContext> {
        let app_id = self.app_id.as_deref().context(
            "No app id configured (use --app-id, api.app_id in estat.toml, or ESTAT_APP_ID)",
        )?;
        Ok(RequestContext::new(app_id)?)
    }
}

/// Encode `frame` and write it to stdout or the requested file.
pub fn emit(frame: &Frame, format: Format, args: &OutputArgs) -> Result<()> {
    let body = encode(frame, format)?;
    log::debug!(
        "{} rows as {} ({})",
        frame.rows.len(),
        format.extension(),
        format.content_type(args.output.is_some())
    );

    match &args.output {
        Some(path) => write_file(path, &body),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            if format != Format::Csv {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
            Ok(())
        }
    }
}

fn write_file(path: &Path, body: &[u8]) -> Result<()> {
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    log::info!("Wrote {} bytes to {}", body.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estat_core::ProgressContext;
    use estat_table::View;

    fn session(root: &Path) -> Session {
        let mut config = Config::default();
        config.storage.root = root.to_path_buf();
        Session::new(config, Some("app".to_string())).unwrap()
    }

    fn xml() -> OutputArgs {
        OutputArgs {
            format: "xml".to_string(),
            output: None,
        }
    }

    #[test]
    fn bad_format_rejected_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let args = table::TableArgs {
            id: "0003109558".to_string(),
            output: xml(),
        };

        let err = table::run(View::Get, args, &session, &ProgressContext::hidden()).unwrap_err();
        assert!(err.to_string().contains("check your extension"));
        let layout = session.layout();
        assert_eq!(std::fs::read_dir(layout.table_dir()).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(layout.tmp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn bad_format_rejected_before_merge() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let args = merge::MergeArgs {
            ids: "1,2".to_string(),
            group_by: "all".to_string(),
            aggregate: String::new(),
            memory_limit: None,
            output: xml(),
        };

        assert!(merge::run(args, &session, &ProgressContext::hidden()).is_err());
        assert_eq!(std::fs::read_dir(session.layout().table_dir()).unwrap().count(), 0);
    }

    #[test]
    fn bad_format_leaves_user_index_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let layout = session.layout();
        std::fs::write(layout.detail_dir().join("42-a-0-g-m-s.dic"), "to,ok,ky\n").unwrap();

        let args = search::SearchArgs {
            query: "ok".to_string(),
            record: true,
            output: xml(),
        };
        let err = search::run_search(args, &session).unwrap_err();
        assert!(err.to_string().contains("check your extension"));
        assert!(!layout.user_index().exists());
    }
}
