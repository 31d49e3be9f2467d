//! estat-index: n-gram index over the dataset catalog
//!
//! The indexer writes one small artifact per dataset under
//! `dictionary/detail/` plus a one-line-per-dataset catalog index. Search is a
//! linear substring scan over those artifacts.

mod indexer;
mod ngram;
mod search;

pub use indexer::{DIC_SUFFIX, build_catalog_index, entry_file_name, index_catalog};
pub use ngram::{WIDTH, ngram_line, ngrams, normalize};
pub use search::{
    CATALOG_HEADER, LIST_ALL, Match, USER_HEADER, matches_frame, record_user_index, search,
    search_catalog, user_index,
};
