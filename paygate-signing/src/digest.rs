//! Digest algorithms and output encodings

use crate::keys::KeyMaterial;
use crate::{Result, SigningError};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rsa::Pkcs1v15Sign;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;

/// Hash or signature function applied to a canonical string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// MD5 over the canonical string (secret appended by the canonicalizer)
    Md5,
    /// SHA-256 over the canonical string
    Sha256,
    /// SHA-512 over the canonical string
    Sha512,
    /// HMAC-SHA256 keyed with the shared secret
    HmacSha256,
    /// `SHA1(hex(MD5(upper(canonical))))`
    ///
    /// Upper-casing happens before MD5 only. The intermediate lowercase hex
    /// text is hashed as-is, never decoded back to bytes.
    Md5ThenSha1,
    /// RSASSA-PKCS1-v1_5 over the SHA-256 digest
    RsaSha256,
}

impl DigestAlgorithm {
    /// Whether the algorithm takes an asymmetric key pair
    pub fn is_asymmetric(self) -> bool {
        matches!(self, DigestAlgorithm::RsaSha256)
    }

    /// Compute the raw digest or signature bytes
    pub fn compute(self, canonical: &str, key: &KeyMaterial) -> Result<Vec<u8>> {
        let data = canonical.as_bytes();
        let out = match self {
            DigestAlgorithm::Md5 => md5::compute(data).0.to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
            DigestAlgorithm::HmacSha256 => {
                let secret = key.shared_secret().ok_or_else(|| {
                    SigningError::Configuration("HMAC-SHA256 requires a shared secret".to_string())
                })?;
                hmac_sha256(secret.expose().as_bytes(), data)
            }
            DigestAlgorithm::Md5ThenSha1 => double_hash(canonical),
            DigestAlgorithm::RsaSha256 => {
                let private = key
                    .rsa_keys()
                    .and_then(|k| k.private_key())
                    .ok_or_else(|| {
                        SigningError::Configuration("RSA signing requires a private key".to_string())
                    })?;
                let hashed = Sha256::digest(data);
                private
                    .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
                    .map_err(|e| SigningError::Configuration(format!("RSA signing failed: {}", e)))?
            }
        };
        Ok(out)
    }
}

/// Text form of a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestEncoding {
    #[default]
    LowerHex,
    UpperHex,
    /// Standard alphabet with padding
    Base64,
}

impl DigestEncoding {
    /// Render digest bytes as text
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            DigestEncoding::LowerHex => hex::encode(bytes),
            DigestEncoding::UpperHex => hex::encode_upper(bytes),
            DigestEncoding::Base64 => STANDARD.encode(bytes),
        }
    }

    /// Parse text back into digest bytes, `None` if it is not valid
    pub fn decode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            DigestEncoding::LowerHex | DigestEncoding::UpperHex => hex::decode(text).ok(),
            DigestEncoding::Base64 => STANDARD.decode(text.trim()).ok(),
        }
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take any size key");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn double_hash(canonical: &str) -> Vec<u8> {
    let upper = canonical.to_uppercase();
    let first = hex::encode(md5::compute(upper.as_bytes()).0);
    Sha1::digest(first.as_bytes()).to_vec()
}
