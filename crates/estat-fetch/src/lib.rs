//! estat-fetch - Paginated retrieval and caching of raw e-Stat responses
//!
//! [`PageStore`] fetches one page of a dataset per cursor and memoizes it as
//! a file; [`catalog`] downloads the dataset catalog the indexer consumes.

pub mod api;
pub mod catalog;
pub mod page_store;
pub mod schema;

pub use api::ApiConfig;
pub use catalog::{
    CatalogEntry, EntryKey, download_catalog, download_stat_center_index, load_catalog,
    parse_catalog,
};
pub use page_store::{DatasetKey, FetchConfig, PageStore};
pub use schema::{ClassObj, OneOrMany, Record, StatsDataResponse};
