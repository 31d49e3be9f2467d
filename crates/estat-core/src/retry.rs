//! Retry with exponential backoff for upstream requests

use std::time::Duration;

use crate::error::Result;

/// Exponential backoff: `base * 2^attempt` (2s, 4s, 8s, ... for a 2s base)
pub fn backoff_duration(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

/// Retry a fallible request with exponential backoff.
///
/// Retryable errors (see [`EstatError::is_retryable`](crate::EstatError::is_retryable))
/// are retried up to `max_retries` times. Returns the first success, or the
/// final error on exhaustion / non-retryable error.
pub fn retry_with_backoff<T>(
    max_retries: u32,
    base_delay: Duration,
    mut attempt_fn: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                let delay = backoff_duration(base_delay, attempt);
                attempt += 1;
                log::warn!("{e}, retry {attempt}/{max_retries} in {delay:?}");
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstatError;

    #[test]
    fn backoff_exponential() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_duration(base, 0), Duration::from_secs(2));
        assert_eq!(backoff_duration(base, 1), Duration::from_secs(4));
        assert_eq!(backoff_duration(base, 2), Duration::from_secs(8));
    }

    #[test]
    fn retries_then_succeeds() {
        let mut calls = 0;
        let result = retry_with_backoff(3, Duration::ZERO, || {
            calls += 1;
            if calls < 3 {
                Err(EstatError::network("reset"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(2, Duration::ZERO, || {
            calls += 1;
            Err(EstatError::network("reset"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(5, Duration::ZERO, || {
            calls += 1;
            Err(EstatError::Upstream {
                status: Some(404),
                message: "not found".to_string(),
                transient: false,
            })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
