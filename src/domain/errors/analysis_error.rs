//! Analysis error types.

use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum AnalysisError {
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("remote call failed after {attempts} attempt(s): {source}")]
    RemoteCallFailed {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("request cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Creates invalid image error.
    #[must_use]
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    /// Creates configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wraps the last remote failure.
    #[must_use]
    pub const fn remote(attempts: u32, source: ModelError) -> Self {
        Self::RemoteCallFailed { attempts, source }
    }

    /// Returns whether the whole request may succeed if submitted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteCallFailed { source, .. } => source.is_transient(),
            Self::Cancelled => true,
            Self::InvalidImage { .. } | Self::Configuration { .. } => false,
        }
    }
}

/// Failures of a single vision model invocation.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum ModelError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("rate limited by the vision service")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("vision service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("response blocked: {reason}")]
    Blocked { reason: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ModelError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates rejected error.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Creates blocked error.
    #[must_use]
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked {
            reason: reason.into(),
        }
    }

    /// Creates invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns whether a retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout
                | Self::RateLimited { .. }
                | Self::ServiceUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ModelError::network("reset").is_transient());
        assert!(ModelError::Timeout.is_transient());
        assert!(
            ModelError::RateLimited {
                retry_after_ms: None
            }
            .is_transient()
        );
        assert!(ModelError::ServiceUnavailable { status: 503 }.is_transient());

        assert!(!ModelError::rejected(400, "bad image").is_transient());
        assert!(!ModelError::blocked("SAFETY").is_transient());
        assert!(!ModelError::invalid_response("no candidates").is_transient());
        assert!(!ModelError::invalid_request("builder error").is_transient());
    }

    #[test]
    fn test_remote_error_message_includes_attempts() {
        let err = AnalysisError::remote(3, ModelError::Timeout);
        assert_eq!(
            err.to_string(),
            "remote call failed after 3 attempt(s): request timed out"
        );
        assert!(err.is_retryable());
    }
}
