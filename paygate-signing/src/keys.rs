//! Secret and key material
//!
//! Key material is built once when an adapter is configured and is never
//! mutated afterwards. Everything here is `Send + Sync`.

use crate::{Result, SigningError};
use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A shared symmetric secret
pub struct SharedSecret(SecretString);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::new(secret.into().into()))
    }

    /// Build from raw bytes, which must be valid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SigningError::Configuration(format!("secret is not valid UTF-8: {}", e)))?;
        Ok(Self::new(text))
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SharedSecret {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

impl From<SecretString> for SharedSecret {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

/// An RSA key pair where either half may be absent
///
/// Signing needs the private half, verification the public half.
#[derive(Clone, Default)]
pub struct RsaKeys {
    private: Option<RsaPrivateKey>,
    public: Option<RsaPublicKey>,
}

impl RsaKeys {
    pub fn new(private: Option<RsaPrivateKey>, public: Option<RsaPublicKey>) -> Self {
        Self { private, public }
    }

    /// Load from text keys, each either PEM or base64-encoded DER
    /// (PKCS#8 for the private key, SubjectPublicKeyInfo for the public key).
    pub fn from_encoded(private: Option<&str>, public: Option<&str>) -> Result<Self> {
        let private = private
            .filter(|s| !s.trim().is_empty())
            .map(parse_private_key)
            .transpose()?;
        let public = public
            .filter(|s| !s.trim().is_empty())
            .map(parse_public_key)
            .transpose()?;
        if private.is_none() && public.is_none() {
            return Err(SigningError::Configuration(
                "RSA key material requires a private or public key".to_string(),
            ));
        }
        Ok(Self { private, public })
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }

    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public.as_ref()
    }
}

impl fmt::Debug for RsaKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeys")
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .field("public", &self.public.is_some())
            .finish()
    }
}

fn is_pem(text: &str) -> bool {
    text.trim_start().starts_with("-----BEGIN")
}

fn decode_der(text: &str, what: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| SigningError::Configuration(format!("{} is not valid base64: {}", what, e)))
}

fn parse_private_key(text: &str) -> Result<RsaPrivateKey> {
    let parsed = if is_pem(text) {
        RsaPrivateKey::from_pkcs8_pem(text)
            .map_err(|e| e.to_string())
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text).map_err(|e| e.to_string()))
    } else {
        let der = decode_der(text, "private key")?;
        RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| e.to_string())
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der).map_err(|e| e.to_string()))
    };
    parsed.map_err(|e| SigningError::Configuration(format!("invalid RSA private key: {}", e)))
}

fn parse_public_key(text: &str) -> Result<RsaPublicKey> {
    let parsed = if is_pem(text) {
        RsaPublicKey::from_public_key_pem(text)
            .map_err(|e| e.to_string())
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(text).map_err(|e| e.to_string()))
    } else {
        let der = decode_der(text, "public key")?;
        RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| e.to_string())
            .or_else(|_| RsaPublicKey::from_pkcs1_der(&der).map_err(|e| e.to_string()))
    };
    parsed.map_err(|e| SigningError::Configuration(format!("invalid RSA public key: {}", e)))
}

/// Secret material attached to a signing scheme
#[derive(Clone, Debug)]
pub enum KeyMaterial {
    /// Shared symmetric secret
    Shared(SharedSecret),
    /// Asymmetric key pair
    Rsa(RsaKeys),
}

impl KeyMaterial {
    pub fn shared(secret: impl Into<String>) -> Self {
        KeyMaterial::Shared(SharedSecret::new(secret))
    }

    pub fn rsa(private: Option<&str>, public: Option<&str>) -> Result<Self> {
        Ok(KeyMaterial::Rsa(RsaKeys::from_encoded(private, public)?))
    }

    pub(crate) fn shared_secret(&self) -> Option<&SharedSecret> {
        match self {
            KeyMaterial::Shared(s) => Some(s),
            KeyMaterial::Rsa(_) => None,
        }
    }

    pub(crate) fn rsa_keys(&self) -> Option<&RsaKeys> {
        match self {
            KeyMaterial::Rsa(k) => Some(k),
            KeyMaterial::Shared(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    fn generate() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }

    #[test]
    fn test_shared_secret_debug_is_redacted() {
        let secret = SharedSecret::new("hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert!(!format!("{:?}", KeyMaterial::Shared(secret)).contains("hunter2"));
    }

    #[test]
    fn test_shared_secret_from_bytes() {
        assert_eq!(SharedSecret::from_bytes(b"abc").unwrap().expose(), "abc");
        assert!(matches!(
            SharedSecret::from_bytes(&[0xff, 0xfe]),
            Err(SigningError::Configuration(_))
        ));
    }

    #[test]
    fn test_rsa_from_base64_der() {
        let private = generate();
        let public = RsaPublicKey::from(&private);
        let private_b64 = STANDARD.encode(private.to_pkcs8_der().unwrap().as_bytes());
        let public_b64 = STANDARD.encode(public.to_public_key_der().unwrap().as_bytes());

        let keys = RsaKeys::from_encoded(Some(&private_b64), Some(&public_b64)).unwrap();
        assert!(keys.private_key().is_some());
        assert_eq!(keys.public_key(), Some(&public));
    }

    #[test]
    fn test_rsa_from_pem() {
        let private = generate();
        let pem = private.to_pkcs8_pem(LineEnding::LF).unwrap();
        let public_pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        let keys = RsaKeys::from_encoded(Some(pem.as_str()), Some(&public_pem)).unwrap();
        assert!(keys.private_key().is_some());
        assert!(keys.public_key().is_some());
    }

    #[test]
    fn test_rsa_malformed_is_configuration_error() {
        assert!(matches!(
            RsaKeys::from_encoded(Some("not base64!"), None),
            Err(SigningError::Configuration(_))
        ));
        assert!(matches!(
            RsaKeys::from_encoded(None, Some("AAAA")),
            Err(SigningError::Configuration(_))
        ));
        assert!(matches!(
            RsaKeys::from_encoded(None, None),
            Err(SigningError::Configuration(_))
        ));
    }
}
