//! Error types for feed operations.

use thiserror::Error;

/// Errors that can occur while fetching prices.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Request failed: {0}")]
    ConnectionFailed(String),

    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No price for symbol: {0}")]
    NotFound(String),

    #[error("API key not configured for {0}")]
    MissingApiKey(&'static str),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(err.to_string())
        } else if err.is_decode() {
            FeedError::ParseError(err.to_string())
        } else {
            FeedError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl FeedError {
    /// Map a non-success HTTP status to the matching error.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => FeedError::AuthenticationFailed(status.to_string()),
            429 => FeedError::RateLimitExceeded,
            code => FeedError::HttpStatus(code),
        }
    }

    /// Returns true if this error is transient and likely to succeed on a later check.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::ConnectionFailed(_)
                | FeedError::Timeout(_)
                | FeedError::RateLimitExceeded
        ) || matches!(self, FeedError::HttpStatus(code) if *code >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert!(matches!(
            FeedError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            FeedError::RateLimitExceeded
        ));
        assert!(matches!(
            FeedError::from_status(reqwest::StatusCode::UNAUTHORIZED),
            FeedError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            FeedError::from_status(reqwest::StatusCode::NOT_FOUND),
            FeedError::HttpStatus(404)
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FeedError::Timeout("slow".into()).is_transient());
        assert!(FeedError::HttpStatus(503).is_transient());
        assert!(!FeedError::HttpStatus(400).is_transient());
        assert!(!FeedError::NotFound("XYZ".into()).is_transient());
        assert!(!FeedError::MissingApiKey("CoinMarketCap").is_transient());
    }
}
