//! Signature comparison

use crate::{Result, SigningError};
use tracing::warn;

/// How a computed signature is compared to a presented one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    /// ASCII case-insensitive, for hex digests
    #[default]
    Insensitive,
    /// Byte-exact
    Exact,
}

/// Compares expected and presented signatures in constant time
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier {
    case: CaseSensitivity,
}

impl SignatureVerifier {
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    pub fn case_insensitive() -> Self {
        Self::new(CaseSensitivity::Insensitive)
    }

    pub fn exact() -> Self {
        Self::new(CaseSensitivity::Exact)
    }

    pub fn matches(&self, expected: &str, presented: &str) -> bool {
        match self.case {
            CaseSensitivity::Insensitive => constant_time_eq_ignore_ascii_case(expected, presented),
            CaseSensitivity::Exact => constant_time_compare(expected, presented),
        }
    }

    /// Verify, returning `SignatureMismatch` carrying both values on failure
    pub fn verify(&self, expected: &str, presented: &str) -> Result<()> {
        if self.matches(expected, presented) {
            return Ok(());
        }
        warn!(expected = %expected, presented = %presented, "Signature mismatch");
        Err(SigningError::SignatureMismatch {
            expected: expected.to_string(),
            presented: presented.to_string(),
        })
    }
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

fn constant_time_eq_ignore_ascii_case(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x.to_ascii_lowercase() ^ y.to_ascii_lowercase();
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let verifier = SignatureVerifier::case_insensitive();
        assert!(verifier.verify("AB12", "ab12").is_ok());
        assert!(verifier.verify("ab12", "AB12").is_ok());
    }

    #[test]
    fn test_case_insensitive_mismatch() {
        let err = SignatureVerifier::case_insensitive()
            .verify("AB12", "ab13")
            .unwrap_err();
        assert_eq!(
            err,
            SigningError::SignatureMismatch {
                expected: "AB12".into(),
                presented: "ab13".into(),
            }
        );
    }

    #[test]
    fn test_exact_rejects_case_change() {
        let verifier = SignatureVerifier::exact();
        assert!(verifier.verify("qwE=", "qwE=").is_ok());
        assert!(verifier.verify("qwE=", "QWE=").is_err());
    }

    #[test]
    fn test_length_mismatch() {
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!SignatureVerifier::default().matches("", "a"));
        assert!(SignatureVerifier::default().matches("", ""));
    }
}
