//! Per-provider signing scheme
//!
//! A [`SigningScheme`] bundles the canonicalization policy, digest algorithm,
//! output encoding and key material a provider's contract fixes. Adapters
//! build one per direction (request, callback) when they are configured and
//! reuse it for every call.

use crate::canonical::{CanonicalizationPolicy, canonicalize};
use crate::digest::{DigestAlgorithm, DigestEncoding};
use crate::keys::KeyMaterial;
use crate::verify::{CaseSensitivity, SignatureVerifier};
use crate::{FieldSet, Result, SigningError};
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SigningScheme {
    policy: CanonicalizationPolicy,
    digest: DigestAlgorithm,
    encoding: DigestEncoding,
    key: KeyMaterial,
    verifier: SignatureVerifier,
}

impl SigningScheme {
    /// Create a scheme, checking the key kind against the algorithm
    pub fn new(
        policy: impl Into<CanonicalizationPolicy>,
        digest: DigestAlgorithm,
        encoding: DigestEncoding,
        key: KeyMaterial,
    ) -> Result<Self> {
        match (&key, digest.is_asymmetric()) {
            (KeyMaterial::Shared(_), true) => {
                return Err(SigningError::Configuration(format!(
                    "{:?} requires RSA key material",
                    digest
                )));
            }
            (KeyMaterial::Rsa(_), false) => {
                return Err(SigningError::Configuration(format!(
                    "{:?} requires a shared secret",
                    digest
                )));
            }
            _ => {}
        }

        let case = if digest.is_asymmetric() {
            CaseSensitivity::Exact
        } else {
            CaseSensitivity::Insensitive
        };

        Ok(Self {
            policy: policy.into(),
            digest,
            encoding,
            key,
            verifier: SignatureVerifier::new(case),
        })
    }

    /// Override how presented signatures are compared
    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.verifier = SignatureVerifier::new(case);
        self
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn policy(&self) -> &CanonicalizationPolicy {
        &self.policy
    }

    /// Canonical digest input for a field set
    pub fn canonical(&self, fields: &FieldSet) -> Result<String> {
        let secret = self.key.shared_secret().map(|s| s.expose()).unwrap_or_default();
        canonicalize(fields, &self.policy, secret)
    }

    /// Compute the encoded signature for a field set
    pub fn sign(&self, fields: &FieldSet) -> Result<String> {
        let canonical = self.canonical(fields)?;
        let raw = self.digest.compute(&canonical, &self.key)?;
        debug!(algorithm = ?self.digest, fields = fields.len(), "Computed signature");
        Ok(self.encoding.encode(&raw))
    }

    /// Sign and attach the signature under the policy's reserved field name
    pub fn sign_into(&self, mut fields: FieldSet) -> Result<FieldSet> {
        let name = self.policy.reserved_name().ok_or_else(|| {
            SigningError::Canonicalization("policy has no reserved signature field".to_string())
        })?;
        let signature = self.sign(&fields)?;
        fields.insert(name, signature);
        Ok(fields)
    }

    /// Verify a presented signature against a field set
    pub fn verify(&self, fields: &FieldSet, presented: &str) -> Result<()> {
        if self.digest.is_asymmetric() {
            return self.verify_rsa(fields, presented);
        }
        let expected = self.sign(fields)?;
        self.verifier.verify(&expected, presented)
    }

    /// Verify a field set that carries its own signature under the reserved name
    pub fn verify_embedded(&self, fields: &FieldSet) -> Result<()> {
        let name = self.policy.reserved_name().ok_or_else(|| {
            SigningError::Canonicalization("policy has no reserved signature field".to_string())
        })?;
        let mut fields = fields.clone();
        let presented = fields.remove(name).unwrap_or_default();
        self.verify(&fields, &presented)
    }

    fn verify_rsa(&self, fields: &FieldSet, presented: &str) -> Result<()> {
        let public = self
            .key
            .rsa_keys()
            .and_then(|k| k.public_key())
            .ok_or_else(|| {
                SigningError::Configuration("RSA verification requires a public key".to_string())
            })?;

        let canonical = self.canonical(fields)?;
        let hashed = Sha256::digest(canonical.as_bytes());
        let mismatch = || {
            tracing::warn!("RSA signature rejected");
            SigningError::SignatureMismatch {
                expected: format!("rsa-sha256:{}", hex::encode(&hashed)),
                presented: presented.to_string(),
            }
        };

        let signature = self.encoding.decode(presented).ok_or_else(mismatch)?;
        public
            .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, &signature)
            .map_err(|_| mismatch())
    }
}
