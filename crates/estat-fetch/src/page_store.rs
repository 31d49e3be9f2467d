//! Page cache keyed by (client id, dataset id, cursor)
//!
//! A cache hit never touches the network, so repeated fetches of the same
//! page are idempotent. Any failure wipes every cached page of the dataset
//! for that client, so a retry starts from a clean slate.

use std::fs;

use indicatif::ProgressBar;

use estat_core::{
    Cursor, DatasetId, EstatError, Fetch, HttpClient, KeyGuard, KeyedLocks, Layout,
    RequestContext, Result, is_shutdown_requested, write_atomic,
};

use crate::api::ApiConfig;
use crate::schema::next_cursor;

/// Pagination behaviour.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api: ApiConfig,
    /// Follow `NEXT_KEY` until the end cursor; otherwise fetch one page only
    pub follow_next_key: bool,
    /// Upper bound on pages per dataset
    pub max_pages: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            follow_next_key: false,
            max_pages: 1000,
        }
    }
}

type PageKey = (String, DatasetId, Cursor);
/// (client id, dataset id): everything derived from one client's pages.
pub type DatasetKey = (String, DatasetId);

/// Fetches and memoizes raw pages.
pub struct PageStore<F: Fetch = HttpClient> {
    layout: Layout,
    config: FetchConfig,
    fetcher: F,
    locks: KeyedLocks<PageKey>,
    datasets: KeyedLocks<DatasetKey>,
}

impl<F: Fetch> PageStore<F> {
    pub fn new(layout: Layout, config: FetchConfig, fetcher: F) -> Result<Self> {
        layout.ensure()?;
        Ok(Self {
            layout,
            config,
            fetcher,
            locks: KeyedLocks::new(),
            datasets: KeyedLocks::new(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Exclusive hold on one client's dataset for a whole
    /// paginate-then-build run. Page fetches take their own finer locks,
    /// so this never deadlocks against [`PageStore::fetch`].
    pub fn lock_dataset(&self, ctx: &RequestContext, id: &DatasetId) -> KeyGuard<'_, DatasetKey> {
        self.datasets
            .acquire((ctx.app_id().to_string(), id.clone()))
    }

    /// Fetch (or reuse) one page and return the cursor of the next one.
    ///
    /// Concurrent calls for the same key wait for the first one and then
    /// read its cache artifact. On failure every page of `id` cached for
    /// this client is removed before the error is returned.
    pub fn fetch(&self, ctx: &RequestContext, id: &DatasetId, cursor: &Cursor) -> Result<Cursor> {
        if cursor.is_end() {
            return Err(EstatError::validation("cannot fetch past the end cursor"));
        }
        let _guard = self
            .locks
            .acquire((ctx.app_id().to_string(), id.clone(), cursor.clone()));

        self.fetch_locked(ctx, id, cursor).inspect_err(|e| {
            log::error!("{id}@{cursor}: {e}");
            self.layout.remove_pages(ctx, id);
        })
    }

    fn fetch_locked(&self, ctx: &RequestContext, id: &DatasetId, cursor: &Cursor) -> Result<Cursor> {
        let path = self.layout.page_path(ctx, id, cursor);

        if path.exists() {
            log::debug!("{id}@{cursor}: using cached page");
            let body = fs::read(&path).map_err(|e| EstatError::io(&path, e))?;
            return next_cursor(&body);
        }

        log::info!("Fetching data from API: {id}, position: {cursor}");
        let url = self.config.api.data_url(ctx, id, cursor);
        let body = self.fetcher.get(&url)?;
        // validate before persisting so a bad body never becomes a cache hit
        let next = next_cursor(&body)?;
        write_atomic(&path, &body)?;
        Ok(next)
    }

    /// Fetch pages of `id` starting at the first cursor.
    ///
    /// With `follow_next_key` the loop runs until the end cursor; otherwise
    /// only the first page is fetched. Returns the number of pages fetched.
    /// The loop is bounded by `max_pages` and aborts on a shutdown request;
    /// both clean up the dataset's pages.
    pub fn paginate(&self, ctx: &RequestContext, id: &DatasetId, pb: &ProgressBar) -> Result<usize> {
        let mut cursor = Cursor::first();
        let mut pages = 0usize;

        loop {
            if pages >= self.config.max_pages {
                self.layout.remove_pages(ctx, id);
                return Err(EstatError::PaginationLimitExceeded {
                    dataset: id.to_string(),
                    max_pages: self.config.max_pages,
                });
            }
            if is_shutdown_requested() {
                self.layout.remove_pages(ctx, id);
                return Err(EstatError::Interrupted);
            }

            let next = self.fetch(ctx, id, &cursor)?;
            pages += 1;
            pb.set_message(format!("{id}: {pages} page(s)"));

            if !self.config.follow_next_key || next.is_end() {
                break;
            }
            log::info!("Next key: {next}");
            cursor = next;
        }

        log::debug!("{id}: {pages} page(s) cached");
        Ok(pages)
    }
}
