//! Per-request context passed explicitly into every core operation

use crate::error::{EstatError, Result};

/// Immutable identity of the caller for one request.
///
/// The client id keys the page cache, so two requests with different ids
/// never share cached pages. It is embedded in cache file names and glob
/// patterns, hence restricted to ASCII alphanumerics, `-` and `_`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    app_id: String,
}

impl RequestContext {
    pub fn new(app_id: &str) -> Result<Self> {
        let ok = !app_id.is_empty()
            && app_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !ok {
            return Err(EstatError::validation("Invalid application ID"));
        }
        Ok(Self {
            app_id: app_id.to_string(),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hex_app_id() {
        let ctx = RequestContext::new("0123abcdef").unwrap();
        assert_eq!(ctx.app_id(), "0123abcdef");
    }

    #[test]
    fn rejects_path_and_glob_characters() {
        assert!(RequestContext::new("").is_err());
        assert!(RequestContext::new("../x").is_err());
        assert!(RequestContext::new("a*b").is_err());
        assert!(RequestContext::new("a.b").is_err());
    }
}
