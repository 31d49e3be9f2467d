//! Validated identifiers: dataset ids, pagination cursors, search queries

use crate::error::{EstatError, Result};

const INVALID_ID: &str = "Invalid statistics data ID";
const INVALID_QUERY: &str = "Invalid query string";

/// Characters rejected in search queries.
const QUERY_FORBIDDEN: &[char] = &[';', '&', '|', '`', '$', '\n', '\r'];

/// Numeric identifier of one upstream statistical table (`statsDataId`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(String);

impl DatasetId {
    /// Accept only non-empty ASCII digit strings.
    pub fn parse(s: &str) -> Result<Self> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(EstatError::validation(INVALID_ID))
        }
    }

    /// Parse a comma-separated id list, trimming whitespace around each id.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(',').map(|part| Self::parse(part.trim())).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pagination token (`startPosition` / `NEXT_KEY`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub const FIRST: &'static str = "1";
    pub const END: &'static str = "-1";

    pub fn first() -> Self {
        Self(Self::FIRST.to_string())
    }

    pub fn end() -> Self {
        Self(Self::END.to_string())
    }

    /// Cursors are upstream record positions, so they are digit strings or the sentinel.
    pub fn parse(s: &str) -> Result<Self> {
        if s == Self::END || (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())) {
            Ok(Self(s.to_string()))
        } else {
            Err(EstatError::upstream(format!("invalid NEXT_KEY {s:?}")))
        }
    }

    pub fn is_end(&self) -> bool {
        self.0 == Self::END
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric position used to order cached pages.
    pub fn position(&self) -> u64 {
        self.0.parse().unwrap_or(0)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject empty queries and shell metacharacters before any index scan.
pub fn validate_query(q: &str) -> Result<()> {
    if q.is_empty() || q.contains(QUERY_FORBIDDEN) {
        return Err(EstatError::validation(INVALID_QUERY));
    }
    Ok(())
}
