//! Catalog → per-dataset n-gram artifacts and the one-line catalog index

use std::fs;

use indicatif::ProgressBar;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use estat_core::{EstatError, Layout, Result, write_atomic};
use estat_fetch::{CatalogEntry, EntryKey};

use crate::ngram::ngram_line;

/// Suffix of every index artifact and catalog index line.
pub const DIC_SUFFIX: &str = ".dic";

/// Separator between the descriptive fields of a key.
pub const FIELD_SEP: char = '-';

/// `{id}-{STAT_NAME}-{SURVEY_DATE}-{GOV_ORG}-{MAIN_CATEGORY}-{SUB_CATEGORY}.dic`
///
/// Path separators inside fields are replaced so the key stays one file name.
pub fn entry_file_name(key: &EntryKey) -> String {
    let fields: [&str; 6] = [
        key.id.as_str(),
        &key.stat_name,
        &key.survey_date,
        &key.gov_org,
        &key.main_category,
        &key.sub_category,
    ];
    let mut name = fields
        .iter()
        .map(|f| f.replace(['/', '\\'], "_"))
        .collect::<Vec<_>>()
        .join(&FIELD_SEP.to_string());
    name.push_str(DIC_SUFFIX);
    name
}

/// Entries with every descriptive field, paired with their artifact name.
///
/// The first entry wins when two entries share a name.
fn keyed(entries: &[CatalogEntry]) -> Vec<(String, &CatalogEntry)> {
    let mut seen = FxHashSet::default();
    entries
        .iter()
        .filter_map(|entry| match entry.key() {
            Ok(key) => Some((entry_file_name(&key), entry)),
            Err(field) => {
                log::warn!(
                    "Missing key in catalog entry {}: {field}",
                    entry.id.as_deref().unwrap_or("?")
                );
                None
            }
        })
        .filter(|(name, _)| {
            let fresh = seen.insert(name.clone());
            if !fresh {
                log::warn!("Duplicate catalog entry skipped: {name}");
            }
            fresh
        })
        .collect()
}

/// Write one n-gram artifact per dataset under `dictionary/detail/`.
///
/// Each artifact has two lines: the n-grams of `STATISTICS_NAME` and of
/// `TITLE`. Artifacts from a previous run that no longer correspond to a
/// catalog entry are removed. Returns the number of artifacts written.
pub fn index_catalog(layout: &Layout, entries: &[CatalogEntry], pb: &ProgressBar) -> Result<usize> {
    layout.ensure()?;
    let detail_dir = layout.detail_dir();
    let keyed = keyed(entries);
    pb.set_length(keyed.len() as u64);

    let written: Vec<String> = keyed
        .par_iter()
        .map(|(name, entry)| -> Result<String> {
            let body = format!(
                "{}\n{}",
                ngram_line(&entry.statistics_name()),
                ngram_line(&entry.title())
            );
            write_atomic(&detail_dir.join(name), body.as_bytes())?;
            pb.inc(1);
            Ok(name.clone())
        })
        .collect::<Result<_>>()?;

    let current: FxHashSet<&str> = written.iter().map(String::as_str).collect();
    let stale = remove_stale(layout, &current)?;
    if stale > 0 {
        log::info!("Removed {stale} stale index file(s)");
    }

    log::info!("Detailed index built: {} entries", written.len());
    Ok(written.len())
}

fn remove_stale(layout: &Layout, current: &FxHashSet<&str>) -> Result<usize> {
    let detail_dir = layout.detail_dir();
    let mut removed = 0;
    for entry in fs::read_dir(&detail_dir).map_err(|e| EstatError::io(&detail_dir, e))? {
        let path = entry.map_err(|e| EstatError::io(&detail_dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(DIC_SUFFIX) && !current.contains(name) {
            fs::remove_file(&path).map_err(|e| EstatError::io(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write `dictionary/index.list.dic`, one key line per dataset.
pub fn build_catalog_index(layout: &Layout, entries: &[CatalogEntry]) -> Result<usize> {
    layout.ensure()?;
    let lines: Vec<String> = keyed(entries).into_iter().map(|(name, _)| name).collect();

    let mut body = lines.join("\n");
    body.push('\n');
    write_atomic(&layout.catalog_index(), body.as_bytes())?;
    log::info!("Index created: {} entries", lines.len());
    Ok(lines.len())
}
