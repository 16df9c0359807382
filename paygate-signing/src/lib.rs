//! Signing and verification core for payment gateway adapters
//!
//! Turns a set of named fields plus a secret into the deterministic
//! signature a gateway expects, and checks signatures on inbound callbacks.
//!
//! ## Overview
//!
//! ```text
//! FieldSet ──▶ Canonicalizer ──▶ DigestAlgorithm ──▶ DigestEncoding
//!              sorted | template  md5 | sha | hmac     hex | base64
//!                                 | double | rsa             │
//!                                                            ▼
//!                                                   SignatureVerifier
//! ```
//!
//! The XPay codec in [`xpay`] is independent of the signing pipeline and is
//! used to wrap a provider's query-like payload on the wire.
//!
//! ## Quick Start
//!
//! ```rust
//! use paygate_signing::{
//!     DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SecretSuffix, SigningScheme,
//!     SortedPolicy,
//! };
//!
//! let scheme = SigningScheme::new(
//!     SortedPolicy::new()
//!         .suffix(SecretSuffix::KeyValue("key".into()))
//!         .reserved("signature"),
//!     DigestAlgorithm::Md5,
//!     DigestEncoding::LowerHex,
//!     KeyMaterial::shared("merchant-key"),
//! )?;
//!
//! let fields = FieldSet::new().with("orderId", "A-1").with("money", "100");
//! let signature = scheme.sign(&fields)?;
//! scheme.verify(&fields, &signature.to_uppercase())?;
//! # Ok::<(), paygate_signing::SigningError>(())
//! ```

pub mod canonical;
pub mod digest;
pub mod error;
pub mod fields;
pub mod keys;
pub mod scheme;
pub mod verify;
pub mod xpay;

pub use canonical::{
    CanonicalizationPolicy, SecretSuffix, SortedPolicy, Template, UrlEscape, canonicalize,
};
pub use digest::{DigestAlgorithm, DigestEncoding};
pub use error::{Result, SigningError};
pub use fields::{FieldSet, FieldSetBuilder};
pub use keys::{KeyMaterial, RsaKeys, SharedSecret};
pub use scheme::SigningScheme;
pub use verify::{CaseSensitivity, SignatureVerifier, constant_time_compare};
