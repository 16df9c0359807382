//! Payment gateway adapters
//!
//! Each adapter builds signed outbound requests for one provider and
//! verifies that provider's inbound callbacks. Signing itself lives in
//! [`paygate_signing`]; adapters only decide which fields go in, in what
//! order, and how the result travels.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Gateway Adapters                         │
//! │                                                               │
//! │   request ──▶ validate ──▶ FieldSet ──▶ SigningScheme ──▶ HTTP │
//! │                                                               │
//! │   callback ──▶ parse ──▶ FieldSet ──▶ verify ──▶ acknowledge   │
//! │                                                               │
//! │  AsiaBank  BFT  ChipPay  Help2Pay  IFP  Long77  Peska  ...     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paygate_providers::providers::{Long77Client, Long77Config};
//! use paygate_providers::providers::long77::PayInCallback;
//!
//! let client = Long77Client::new(Long77Config::new("https://api.example.com", "partner", "secret"))?;
//!
//! // Inbound callback body
//! let callback = PayInCallback::from_json(&body)?;
//! match client.acknowledge(&callback) {
//!     Ok(ack) => respond(200, ack),
//!     Err(e) if e.is_rejection() => respond(400, ""),
//!     Err(e) => return Err(e),
//! }
//! ```
//!
//! ## Configuration
//!
//! Every provider config can also be read from the environment:
//!
//! ```rust,ignore
//! use paygate_providers::config::EnvLoader;
//!
//! let loader = EnvLoader::with_dotenv(Some("PAYGATE_PESKA".into()));
//! let config = PeskaConfig::from_env(&loader)?;
//! ```

pub mod amount;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod providers;

mod wire;

pub use amount::{fits_scale, format_fixed, format_fixed_bank};
pub use client::ProviderClient;
pub use config::{EnvLoader, Environment};
pub use error::{GatewayError, GatewayResult};
pub use form::{PaymentForm, parse_form};

pub use paygate_signing::{FieldSet, SigningError};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{EnvLoader, Environment};
    pub use crate::error::{GatewayError, GatewayResult};
    pub use crate::form::PaymentForm;
    pub use crate::providers::*;
}
