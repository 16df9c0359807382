//! Error types for gateway adapters

use paygate_signing::SigningError;
use thiserror::Error;

/// Gateway adapter error types
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Signing, verification or decoding failure
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// A request failed local validation before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Adapter configuration is incomplete or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The provider answered with a failure
    #[error("Provider error {code}: {message}")]
    Provider {
        /// Provider-specific result code
        code: String,
        /// Provider message
        message: String,
    },

    /// An inbound callback has the wrong shape or belongs to someone else
    #[error("Callback error: {0}")]
    Callback(String),
}

impl GatewayError {
    pub(crate) fn provider(code: impl ToString, message: impl Into<String>) -> Self {
        GatewayError::Provider {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error means a callback must be rejected
    pub fn is_rejection(&self) -> bool {
        match self {
            GatewayError::Signing(e) => e.is_trust_failure(),
            GatewayError::Callback(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::InvalidUrl(err.to_string())
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_error_passthrough() {
        let err: GatewayError = SigningError::SignatureMismatch {
            expected: "a".into(),
            presented: "b".into(),
        }
        .into();
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Signature mismatch: expected a, presented b");
    }

    #[test]
    fn test_provider_error_display() {
        let err = GatewayError::provider(40102, "signature verification failed");
        assert_eq!(err.to_string(), "Provider error 40102: signature verification failed");
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_url_error_conversion() {
        let err: GatewayError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, GatewayError::InvalidUrl(_)));
    }
}
