//! On-disk layout of caches, tables and dictionaries
//!
//! ```text
//! {root}/
//! ├── tmp/                                   # raw pages: {appId}.{id}.{cursor}.json
//! ├── data-cache/                            # flattened tables: {id}.csv
//! └── dictionary/
//!     ├── all.json.dic                       # downloaded catalog
//!     ├── index.list.dic                     # one line per dataset
//!     ├── user.csv.dic                       # append-only search log
//!     ├── stat.center.csv.dic                # statistics-center index
//!     └── detail/                            # n-gram index, one file per dataset
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::context::RequestContext;
use crate::error::{EstatError, Result};
use crate::id::{Cursor, DatasetId};

/// Directory layout rooted at a single base directory.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create every directory of the layout.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.tmp_dir(),
            self.table_dir(),
            self.dictionary_dir(),
            self.detail_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| EstatError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn table_dir(&self) -> PathBuf {
        self.root.join("data-cache")
    }

    pub fn dictionary_dir(&self) -> PathBuf {
        self.root.join("dictionary")
    }

    pub fn detail_dir(&self) -> PathBuf {
        self.dictionary_dir().join("detail")
    }

    pub fn catalog_json(&self) -> PathBuf {
        self.dictionary_dir().join("all.json.dic")
    }

    pub fn catalog_index(&self) -> PathBuf {
        self.dictionary_dir().join("index.list.dic")
    }

    pub fn user_index(&self) -> PathBuf {
        self.dictionary_dir().join("user.csv.dic")
    }

    pub fn stat_center_index(&self) -> PathBuf {
        self.dictionary_dir().join("stat.center.csv.dic")
    }

    /// Cache artifact for one page: `tmp/{appId}.{id}.{cursor}.json`
    pub fn page_path(&self, ctx: &RequestContext, id: &DatasetId, cursor: &Cursor) -> PathBuf {
        self.tmp_dir()
            .join(format!("{}.{id}.{cursor}.json", ctx.app_id()))
    }

    /// Flattened table artifact: `data-cache/{id}.csv`
    pub fn table_path(&self, id: &DatasetId) -> PathBuf {
        self.table_dir().join(format!("{id}.csv"))
    }

    /// All cached pages of a dataset for one client, sorted by cursor position.
    pub fn cached_pages(&self, ctx: &RequestContext, id: &DatasetId) -> Vec<(Cursor, PathBuf)> {
        // the root is a literal path, only the file name is a pattern
        let dir = glob::Pattern::escape(&self.tmp_dir().to_string_lossy());
        let pattern = Path::new(&dir).join(format!("{}.{id}.*.json", ctx.app_id()));
        let pattern_str = pattern.to_string_lossy();

        let mut pages: Vec<(Cursor, PathBuf)> = match glob::glob(&pattern_str) {
            Ok(paths) => paths
                .filter_map(|entry| entry.ok())
                .filter_map(|path| {
                    let cursor = page_cursor(&path)?;
                    Some((cursor, path))
                })
                .collect(),
            Err(e) => {
                log::warn!("invalid page pattern {pattern_str}: {e}");
                Vec::new()
            }
        };
        pages.sort_by_key(|(cursor, _)| cursor.position());
        pages
    }

    /// Delete every cached page of a dataset for one client (best-effort).
    ///
    /// Returns the number of files removed.
    pub fn remove_pages(&self, ctx: &RequestContext, id: &DatasetId) -> usize {
        let mut removed = 0;
        for (_, path) in self.cached_pages(ctx, id) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Cleaned up temp file: {}", path.display());
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to clean up {}: {e}", path.display()),
            }
        }
        removed
    }
}

/// Extract the cursor from `{appId}.{id}.{cursor}.json`.
fn page_cursor(path: &Path) -> Option<Cursor> {
    let stem = path.file_stem()?.to_str()?;
    let cursor = stem.rsplit('.').next()?;
    Cursor::parse(cursor).ok().filter(|c| !c.is_end())
}

/// Write `contents` to `path` through a sibling `.tmp` file and a rename.
///
/// Readers either see the previous artifact or the complete new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| EstatError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(EstatError::io(path, e));
    }
    Ok(())
}
