//! Generalizes the host's `providers::policy::MappingAction` taxonomy
//! (`RateLimit`/`Ban`/`Invalid`/`ModelUnsupported`/`None`) down to the three
//! outcomes `spec.md` §4.4's error table actually branches on.

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOutcome {
    Success,
    RateLimited,
    PermanentDenial,
    Transient,
}

pub fn classify_upstream_status(status: StatusCode) -> UpstreamOutcome {
    if status.is_success() {
        UpstreamOutcome::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        UpstreamOutcome::RateLimited
    } else if status == StatusCode::FORBIDDEN {
        UpstreamOutcome::PermanentDenial
    } else {
        UpstreamOutcome::Transient
    }
}

/// A 429's `Retry-After` (seconds) becomes the `markCooling` reset hint;
/// absent or unparseable falls back to `None` so the caller defaults to
/// next UTC+7 midnight.
pub fn parse_reset_hint(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let seconds: i64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Utc::now() + Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert_eq!(
            classify_upstream_status(StatusCode::TOO_MANY_REQUESTS),
            UpstreamOutcome::RateLimited
        );
    }

    #[test]
    fn forbidden_is_permanent_denial() {
        assert_eq!(
            classify_upstream_status(StatusCode::FORBIDDEN),
            UpstreamOutcome::PermanentDenial
        );
    }

    #[test]
    fn server_error_is_transient() {
        assert_eq!(
            classify_upstream_status(StatusCode::BAD_GATEWAY),
            UpstreamOutcome::Transient
        );
    }

    #[test]
    fn reset_hint_parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "120".parse().unwrap());
        assert!(parse_reset_hint(&headers).is_some());
    }

    #[test]
    fn reset_hint_absent_without_header() {
        assert!(parse_reset_hint(&HeaderMap::new()).is_none());
    }
}
