//! Error types for external lookups.

use thiserror::Error;

/// Failure of an external distance, directions, geocoding, or backend call.
///
/// The pipeline treats lookup failures as fail-closed per candidate: the
/// affected candidate is excluded and its siblings are evaluated normally.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Transport-level failure: connect, timeout, TLS, body read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// The service answered 200 but reported a failure status in the body,
    /// e.g. a distance-matrix element with `ZERO_RESULTS`.
    #[error("service reported status {0:?}")]
    Service(String),

    /// The payload did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_cause() {
        let err = LookupError::Service("ZERO_RESULTS".to_string());
        assert!(err.to_string().contains("ZERO_RESULTS"));

        let err = LookupError::Malformed("no routes in response".to_string());
        assert!(err.to_string().contains("no routes"));
    }
}
