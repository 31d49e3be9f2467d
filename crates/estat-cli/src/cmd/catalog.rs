//! Catalog subcommand - download the dataset catalog and build the indexes

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use estat_core::{HttpClient, ProgressContext, fmt_num};
use estat_fetch::{download_catalog, download_stat_center_index, load_catalog};
use estat_index::{build_catalog_index, index_catalog};

use super::Session;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub action: CatalogAction,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Download every statistics table id (getStatsList)
    Download,
    /// Build the catalog index and the n-gram index from the downloaded catalog
    Index,
    /// Download the statistics-center CSV index
    StatCenter,
}

pub fn run(args: CatalogArgs, session: &Session, progress: &ProgressContext) -> Result<()> {
    let fetcher = HttpClient::new(session.config.http_config());
    let api = &session.store.config().api;
    let layout = session.layout();

    match args.action {
        CatalogAction::Download => {
            let ctx = session.context()?;
            let count = download_catalog(&fetcher, api, &ctx, layout)
                .context("Failed to download catalog")?;
            println!("Downloaded {} catalog entries", fmt_num(count));
        }
        CatalogAction::Index => {
            let entries = load_catalog(layout)?;
            let lines = build_catalog_index(layout, &entries)?;
            let pb = progress.count_bar("index", entries.len() as u64);
            let written = index_catalog(layout, &entries, &pb)?;
            pb.finish_and_clear();
            println!(
                "Indexed {} datasets ({} catalog lines)",
                fmt_num(written),
                fmt_num(lines)
            );
        }
        CatalogAction::StatCenter => {
            let bytes = download_stat_center_index(&fetcher, api, layout)
                .context("Failed to download stat center index")?;
            println!("Downloaded stat center index ({} bytes)", fmt_num(bytes));
        }
    }
    Ok(())
}
