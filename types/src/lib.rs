//! Fundamental types for the Coffer wallet engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, public keys, decimal amounts, timestamps, network profiles and the
//! multi-signature descriptor.

pub mod address;
pub mod amount;
pub mod error;
pub mod multisig;
pub mod network;
pub mod time;

pub use address::{Address, PublicKey};
pub use amount::DecimalValue;
pub use error::TypesError;
pub use multisig::MultiSignatureDescriptor;
pub use network::NetworkProfile;
pub use time::Timestamp;
