//! Shared classification of transport failures.

use herald_core::error::{ErrorCode, HeraldError};

/// Map a failed request to a herald error.
///
/// Timeouts and connection failures are transient; anything carrying an HTTP
/// status goes through [`HeraldError::from_http_status`].
pub(crate) fn classify_reqwest(provider: &str, err: reqwest::Error) -> HeraldError {
    if err.is_timeout() {
        return HeraldError::timeout(format!("{} request timed out", provider));
    }
    if let Some(status) = err.status() {
        return HeraldError::from_http_status(status.as_u16(), &err.to_string());
    }
    HeraldError::Network {
        message: format!("{} request failed: {}", provider, err),
        code: ErrorCode::NetConnectionFailed,
        source: Some(Box::new(err)),
    }
}
