//! Error types for signing and verification

use thiserror::Error;

/// Signing error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// Key material could not be used (malformed, missing or the wrong kind)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A field set or template cannot be canonicalized
    #[error("Canonicalization error: {0}")]
    Canonicalization(String),

    /// The presented signature does not match the computed one
    #[error("Signature mismatch: expected {expected}, presented {presented}")]
    SignatureMismatch {
        /// Signature computed locally
        expected: String,
        /// Signature carried by the request or callback
        presented: String,
    },

    /// XPay-encoded text could not be decoded
    #[error("Malformed encoding at position {position}: {reason}")]
    MalformedEncoding {
        /// Character offset where decoding stopped
        position: usize,
        /// What was wrong with the input
        reason: String,
    },
}

impl SigningError {
    /// Returns true when the error rejects a single request or callback
    /// rather than indicating a broken setup.
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            SigningError::SignatureMismatch { .. } | SigningError::MalformedEncoding { .. }
        )
    }

    pub(crate) fn malformed(position: usize, reason: impl Into<String>) -> Self {
        SigningError::MalformedEncoding {
            position,
            reason: reason.into(),
        }
    }
}

/// Result type for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_failure_classification() {
        let mismatch = SigningError::SignatureMismatch {
            expected: "ab".into(),
            presented: "cd".into(),
        };
        assert!(mismatch.is_trust_failure());
        assert!(SigningError::malformed(3, "empty run").is_trust_failure());
        assert!(!SigningError::Configuration("bad key".into()).is_trust_failure());
        assert!(!SigningError::Canonicalization("reserved".into()).is_trust_failure());
    }

    #[test]
    fn test_display_carries_both_signatures() {
        let err = SigningError::SignatureMismatch {
            expected: "AB12".into(),
            presented: "ab13".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AB12"));
        assert!(msg.contains("ab13"));
    }
}
