//! Error taxonomy shared by every core operation

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, EstatError>;

/// Failure of a core operation.
///
/// Validation errors are raised before any I/O. Upstream errors carry the HTTP
/// status when there was one and say whether the failure was on the wire,
/// so callers can decide whether to retry (see [`EstatError::is_retryable`]).
/// An in-band error status or an unparseable body is never transient.
#[derive(Debug)]
pub enum EstatError {
    /// Malformed dataset id, search query, command, format or group column
    Validation(String),
    /// Network/HTTP failure, in-band error status, or malformed response body
    Upstream {
        status: Option<u16>,
        message: String,
        /// Connection failure or timeout before any status was received
        transient: bool,
    },
    /// Cached pages, tables or catalog required by the operation are absent
    MissingData(String),
    /// Unsupported aggregate keyword
    Aggregation(String),
    /// Upstream never returned the end cursor within the page ceiling
    PaginationLimitExceeded { dataset: String, max_pages: usize },
    /// A record carries a column that the first record did not declare
    SchemaMismatch { dataset: String, column: String },
    /// Query engine failure while merging
    Query(String),
    /// Shutdown was requested while paginating
    Interrupted,
    /// Local file-system failure
    Io {
        path: Option<PathBuf>,
        source: std::io::Error,
    },
}

impl std::fmt::Display for EstatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::Upstream {
                status: Some(s),
                message,
                ..
            } => write!(f, "API request failed: HTTP {s}: {message}"),
            Self::Upstream {
                status: None,
                message,
                ..
            } => write!(f, "API request failed: {message}"),
            Self::MissingData(msg) => write!(f, "missing data: {msg}"),
            Self::Aggregation(agg) => write!(f, "unsupported aggregate: {agg:?}"),
            Self::PaginationLimitExceeded { dataset, max_pages } => write!(
                f,
                "{dataset}: upstream did not finish within {max_pages} pages"
            ),
            Self::SchemaMismatch { dataset, column } => {
                write!(f, "{dataset}: record has unexpected column {column:?}")
            }
            Self::Query(msg) => write!(f, "query failed: {msg}"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Io {
                path: Some(p),
                source,
            } => write!(f, "IO error on {}: {source}", p.display()),
            Self::Io { path: None, source } => write!(f, "IO error: {source}"),
        }
    }
}

impl std::error::Error for EstatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EstatError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

impl EstatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// The service answered, but with something unusable.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: msg.into(),
            transient: false,
        }
    }

    /// The request never got an answer.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: msg.into(),
            transient: true,
        }
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an upstream error from a reqwest error.
    ///
    /// The URL is stripped so the client id never ends up in logs.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Upstream {
            status: e.status().map(|s| s.as_u16()),
            message: reqwest_message(e),
            transient: e.is_timeout() || e.is_connect() || e.is_request(),
        }
    }

    /// Rate limits, server errors and connection failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream {
                status, transient, ..
            } => *transient || matches!(status, Some(429) | Some(500..=599)),
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

fn reqwest_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_decode() {
        "malformed response body".to_string()
    } else if let Some(status) = e.status() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        "request failed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn http_err(status: u16) -> EstatError {
        EstatError::Upstream {
            status: Some(status),
            message: "test".to_string(),
            transient: false,
        }
    }

    #[test]
    fn http_429_retryable() {
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn http_503_retryable() {
        assert!(http_err(503).is_retryable());
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!http_err(404).is_retryable());
    }

    #[test]
    fn network_error_without_status_retryable() {
        assert!(EstatError::network("connection refused").is_retryable());
    }

    #[test]
    fn unusable_answer_not_retryable() {
        assert!(!EstatError::upstream("malformed response body").is_retryable());
        assert!(!EstatError::upstream("status 100: 認証に失敗しました。").is_retryable());
    }

    #[test]
    fn validation_never_retryable() {
        assert!(!EstatError::validation("Invalid query string").is_retryable());
    }

    #[test]
    fn io_timeout_retryable() {
        let err = EstatError::from(std::io::Error::new(ErrorKind::TimedOut, "slow"));
        assert!(err.is_retryable());
    }

    #[test]
    fn display_upstream_with_status() {
        assert_eq!(format!("{}", http_err(500)), "API request failed: HTTP 500: test");
    }

    #[test]
    fn display_io_with_path() {
        let err = EstatError::io("/tmp/x.json", std::io::Error::new(ErrorKind::NotFound, "gone"));
        let msg = format!("{err}");
        assert!(msg.contains("/tmp/x.json"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn display_pagination_limit() {
        let err = EstatError::PaginationLimitExceeded {
            dataset: "0003".to_string(),
            max_pages: 3,
        };
        assert_eq!(format!("{err}"), "0003: upstream did not finish within 3 pages");
    }
}
