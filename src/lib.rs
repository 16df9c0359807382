// Paygate - Request signing and callback verification for payment gateways
//
// This library bundles the signing core with the per-gateway adapters, each
// adapter behind its own feature.

// Re-export the signing core
pub use paygate_signing::*;

// Re-export adapter infrastructure
#[cfg(feature = "paygate-providers")]
pub use paygate_providers::{
    EnvLoader, Environment, GatewayError, GatewayResult, PaymentForm, ProviderClient, amount,
    config, form, parse_form,
};

// Re-export gateway adapters
#[cfg(feature = "asiabank")]
pub use paygate_providers::providers::asiabank;

#[cfg(feature = "bft")]
pub use paygate_providers::providers::bft;

#[cfg(feature = "chippay")]
pub use paygate_providers::providers::chippay;

#[cfg(feature = "help2pay")]
pub use paygate_providers::providers::help2pay;

#[cfg(feature = "ifp")]
pub use paygate_providers::providers::ifp;

#[cfg(feature = "long77")]
pub use paygate_providers::providers::long77;

#[cfg(feature = "peska")]
pub use paygate_providers::providers::peska;

#[cfg(feature = "ragapay")]
pub use paygate_providers::providers::ragapay;

#[cfg(feature = "xpay")]
pub use paygate_providers::providers::xpay as xpay_gateway;

/// Prelude for common imports
///
/// ```rust,ignore
/// use paygate::prelude::*;
/// ```
pub mod prelude {
    pub use paygate_signing::{
        DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningError, SigningScheme,
        SortedPolicy, Template,
    };

    #[cfg(feature = "paygate-providers")]
    pub use paygate_providers::prelude::*;
}
