//! Gateway adapters, one module per provider

#[cfg(feature = "asiabank")]
pub mod asiabank;

#[cfg(feature = "bft")]
pub mod bft;

#[cfg(feature = "chippay")]
pub mod chippay;

#[cfg(feature = "help2pay")]
pub mod help2pay;

#[cfg(feature = "ifp")]
pub mod ifp;

#[cfg(feature = "long77")]
pub mod long77;

#[cfg(feature = "peska")]
pub mod peska;

#[cfg(feature = "ragapay")]
pub mod ragapay;

#[cfg(feature = "xpay")]
pub mod xpay;

#[cfg(feature = "asiabank")]
pub use asiabank::{AsiaBankClient, AsiaBankConfig};

#[cfg(feature = "bft")]
pub use bft::{BftClient, BftConfig};

#[cfg(feature = "chippay")]
pub use chippay::{ChipPayClient, ChipPayConfig};

#[cfg(feature = "help2pay")]
pub use help2pay::{Help2PayClient, Help2PayConfig};

#[cfg(feature = "ifp")]
pub use ifp::{IfpClient, IfpConfig};

#[cfg(feature = "long77")]
pub use long77::{Long77Client, Long77Config};

#[cfg(feature = "peska")]
pub use peska::{PeskaClient, PeskaConfig};

#[cfg(feature = "ragapay")]
pub use ragapay::{RagaPayClient, RagaPayConfig};

#[cfg(feature = "xpay")]
pub use xpay::{XPayClient, XPayConfig};
