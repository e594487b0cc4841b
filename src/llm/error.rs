//! Provider error types
//!
//! Shared by the chat-completion and speech providers: every remote call
//! classifies its failure into a [`ProviderErrorKind`].

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a remote provider call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unknown, message)
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else {
            Self::unknown(format!("Request failed: {e}"))
        }
    }

    /// Classify a non-success HTTP status with the provider's error message
    pub fn from_status(status: StatusCode, message: &str) -> Self {
        match status.as_u16() {
            400 | 404 | 422 => Self::invalid_request(format!("Invalid request: {message}")),
            401 | 403 => Self::auth(format!("Authentication failed: {message}")),
            408 => Self::timeout(format!("Provider timeout: {message}")),
            429 => Self::rate_limit(format!("Rate limit exceeded: {message}")),
            500..=599 => Self::server_error(format!("Server error: {message}")),
            _ => Self::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

/// Error classification, reported to callers and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection failures
    Network,
    /// The call exceeded its deadline
    Timeout,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Unknown error
    Unknown,
}

impl ProviderErrorKind {
    /// Whether the same call could succeed if repeated later.
    ///
    /// Surfaced to clients only; the agent never retries on its own.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimit | Self::ServerError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let cases = [
            (StatusCode::BAD_REQUEST, ProviderErrorKind::InvalidRequest),
            (StatusCode::UNAUTHORIZED, ProviderErrorKind::Auth),
            (StatusCode::FORBIDDEN, ProviderErrorKind::Auth),
            (StatusCode::TOO_MANY_REQUESTS, ProviderErrorKind::RateLimit),
            (StatusCode::BAD_GATEWAY, ProviderErrorKind::ServerError),
            (StatusCode::IM_A_TEAPOT, ProviderErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            assert_eq!(ProviderError::from_status(status, "boom").kind, kind);
        }
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ProviderErrorKind::Network.is_transient());
        assert!(ProviderErrorKind::RateLimit.is_transient());
        assert!(!ProviderErrorKind::Auth.is_transient());
        assert!(!ProviderErrorKind::InvalidRequest.is_transient());
    }

    #[test]
    fn test_message_is_display() {
        let err = ProviderError::auth("bad key");
        assert_eq!(err.to_string(), "bad key");
    }
}
