//! Network profile: the per-network constants the engine needs.

use serde::{Deserialize, Serialize};

/// Static description of the ledger network a wallet lives on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Network identifier, e.g. `ark.devnet`.
    pub id: String,
    /// Ticker of the native coin; doubles as the wallet currency for
    /// exchange-rate lookups.
    pub ticker: String,
    /// Number of decimals between the ledger-native integer unit and the
    /// human-readable unit.
    pub decimals: u32,
    /// Whether wallets on this network are identified by an extended public
    /// key. Such networks never overwrite the stored key from ledger records.
    #[serde(default)]
    pub uses_extended_public_key: bool,
}

impl NetworkProfile {
    pub fn new(id: impl Into<String>, ticker: impl Into<String>, decimals: u32) -> Self {
        Self {
            id: id.into(),
            ticker: ticker.into(),
            decimals,
            uses_extended_public_key: false,
        }
    }

    pub fn with_extended_public_key(mut self) -> Self {
        self.uses_extended_public_key = true;
        self
    }
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self::new("ark.devnet", "DARK", 8)
    }
}
