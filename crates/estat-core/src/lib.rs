//! estat-core - Common infrastructure for the e-Stat adaptor
//!
//! Error taxonomy, validated identifiers, per-request context, the on-disk
//! directory layout, and the blocking HTTP plumbing shared by the fetch,
//! table, index and merge crates.

pub mod context;
pub mod error;
pub mod http;
pub mod id;
pub mod keyed_lock;
pub mod layout;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;

// Re-exports for convenience
pub use context::RequestContext;
pub use error::{EstatError, Result};
pub use http::{Fetch, HttpClient, HttpConfig, SHARED_RUNTIME, build_uri};
pub use id::{Cursor, DatasetId, validate_query};
pub use keyed_lock::{KeyGuard, KeyedLocks};
pub use layout::{Layout, write_atomic};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
