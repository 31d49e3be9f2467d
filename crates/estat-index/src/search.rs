//! Substring search over the n-gram artifacts, and CSV projections of the
//! catalog and user indexes

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use rayon::prelude::*;

use estat_core::{DatasetId, EstatError, Layout, Result, validate_query};
use estat_table::Frame;

use crate::indexer::{DIC_SUFFIX, FIELD_SEP};

/// Literal query that lists the whole catalog index.
pub const LIST_ALL: &str = "index";

pub const CATALOG_HEADER: [&str; 5] = ["statsDataId", "調査名", "調査年月", "組織名", "カテゴリー"];
pub const USER_HEADER: [&str; 2] = ["statsDataId", "検索語"];

/// One matching artifact line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: DatasetId,
    pub query: String,
}

impl Match {
    /// `id,query`, the user index line format.
    pub fn to_line(&self) -> String {
        format!("{},{}", self.id, self.query)
    }
}

/// Dataset id from an artifact name: the text before the first separator.
fn id_from_file_name(name: &str) -> Option<DatasetId> {
    let id = name.split(FIELD_SEP).next()?;
    DatasetId::parse(id).ok()
}

/// Index artifacts sorted by file name.
fn artifacts(layout: &Layout) -> Result<Vec<(String, PathBuf)>> {
    let dir = layout.detail_dir();
    let read = match fs::read_dir(&dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EstatError::io(&dir, e)),
    };

    let mut files = Vec::new();
    for entry in read {
        let path = entry.map_err(|e| EstatError::io(&dir, e))?.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(DIC_SUFFIX) {
                files.push((name.to_string(), path.clone()));
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Every artifact line containing `query`, as `(id, query)` pairs.
///
/// No ranking: a dataset matches once per matching line. Unreadable
/// artifacts are skipped with a warning.
pub fn search(layout: &Layout, query: &str) -> Result<Vec<Match>> {
    validate_query(query)?;
    let files = artifacts(layout)?;

    let per_file: Vec<Vec<Match>> = files
        .par_iter()
        .map(|(name, path)| {
            let Some(id) = id_from_file_name(name) else {
                log::warn!("Skipping index file without dataset id: {name}");
                return Vec::new();
            };
            match fs::read_to_string(path) {
                Ok(content) => content
                    .lines()
                    .filter(|line| line.contains(query))
                    .map(|_| Match {
                        id: id.clone(),
                        query: query.to_string(),
                    })
                    .collect(),
                Err(e) => {
                    log::warn!("Error reading {name}: {e}");
                    Vec::new()
                }
            }
        })
        .collect();

    let matches: Vec<Match> = per_file.into_iter().flatten().collect();
    log::debug!("{query:?}: {} match(es) in {} file(s)", matches.len(), files.len());
    Ok(matches)
}

/// Search and append the matches to `dictionary/user.csv.dic`.
///
/// The append is not transactional; a crash mid-write can leave a partial
/// line.
pub fn record_user_index(layout: &Layout, query: &str) -> Result<Vec<Match>> {
    let matches = search(layout, query)?;
    if matches.is_empty() {
        return Ok(matches);
    }

    let path = layout.user_index();
    let mut body = String::new();
    for m in &matches {
        body.push_str(&m.to_line());
        body.push('\n');
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| f.write_all(body.as_bytes()))
        .map_err(|e| EstatError::io(&path, e))?;
    log::info!("User index updated with {} entries", matches.len());
    Ok(matches)
}

/// Matches as a `statsDataId,検索語` table.
pub fn matches_frame(matches: &[Match]) -> Frame {
    Frame {
        header: USER_HEADER.iter().map(|h| h.to_string()).collect(),
        rows: matches
            .iter()
            .map(|m| vec![m.id.to_string(), m.query.clone()])
            .collect(),
    }
}

/// Split one catalog index line into its displayed columns.
///
/// The last field carries the `.dic` suffix and is dropped. A survey date
/// written as a `from-to` range splits into two fields and is rejoined.
fn catalog_row(line: &str) -> Vec<String> {
    let mut parts: Vec<String> = line
        .split(FIELD_SEP)
        .filter(|p| !p.contains(DIC_SUFFIX))
        .map(str::to_string)
        .collect();
    if parts.len() == CATALOG_HEADER.len() + 1 {
        let to = parts.remove(3);
        parts[2] = format!("{}{FIELD_SEP}{to}", parts[2]);
    }
    parts
}

/// Project the catalog index as a table.
///
/// [`LIST_ALL`] lists every entry; any other query keeps the lines that
/// contain it.
pub fn search_catalog(layout: &Layout, query: &str) -> Result<Frame> {
    validate_query(query)?;
    let path = layout.catalog_index();
    let content = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EstatError::missing(format!("catalog index not built: {}", path.display()))
        } else {
            EstatError::io(&path, e)
        }
    })?;

    let rows = content
        .lines()
        .filter(|line| !line.is_empty())
        .filter(|line| query == LIST_ALL || line.contains(query))
        .map(catalog_row)
        .collect();
    Ok(Frame {
        header: CATALOG_HEADER.iter().map(|h| h.to_string()).collect(),
        rows,
    })
}

/// Project the user index as a table. An index never written is empty.
pub fn user_index(layout: &Layout) -> Result<Frame> {
    let path = layout.user_index();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(EstatError::io(&path, e)),
    };

    let rows = content
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect();
    Ok(Frame {
        header: USER_HEADER.iter().map(|h| h.to_string()).collect(),
        rows,
    })
}
