//! Known-wallet lookup: names for exchange, team and other public addresses.

use coffer_types::Address;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownWalletKind {
    Exchange,
    Team,
    #[default]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownWallet {
    pub network: String,
    pub address: Address,
    pub name: String,
    #[serde(default)]
    pub kind: KnownWalletKind,
}

pub trait KnownWalletService: Send + Sync {
    fn find(&self, network: &str, address: &Address) -> Option<KnownWallet>;

    fn name(&self, network: &str, address: &Address) -> Option<String> {
        self.find(network, address).map(|w| w.name)
    }

    fn is_known(&self, network: &str, address: &Address) -> bool {
        self.find(network, address).is_some()
    }

    fn is_exchange(&self, network: &str, address: &Address) -> bool {
        self.find(network, address)
            .is_some_and(|w| w.kind == KnownWalletKind::Exchange)
    }

    fn is_team(&self, network: &str, address: &Address) -> bool {
        self.find(network, address)
            .is_some_and(|w| w.kind == KnownWalletKind::Team)
    }
}

/// A static list of known wallets.
#[derive(Clone, Debug, Default)]
pub struct KnownWallets {
    entries: Vec<KnownWallet>,
}

impl KnownWallets {
    pub fn new(entries: Vec<KnownWallet>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KnownWalletService for KnownWallets {
    fn find(&self, network: &str, address: &Address) -> Option<KnownWallet> {
        self.entries
            .iter()
            .find(|w| w.network == network && &w.address == address)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> KnownWallets {
        KnownWallets::new(vec![
            KnownWallet {
                network: "ark.devnet".into(),
                address: "DExchange".into(),
                name: "Big Exchange".into(),
                kind: KnownWalletKind::Exchange,
            },
            KnownWallet {
                network: "ark.devnet".into(),
                address: "DTeam".into(),
                name: "Core Team".into(),
                kind: KnownWalletKind::Team,
            },
        ])
    }

    #[test]
    fn lookups_are_scoped_to_network() {
        let known = list();
        assert_eq!(
            known.name("ark.devnet", &"DExchange".into()).as_deref(),
            Some("Big Exchange")
        );
        assert!(known.name("ark.mainnet", &"DExchange".into()).is_none());
    }

    #[test]
    fn classifies_kinds() {
        let known = list();
        assert!(known.is_exchange("ark.devnet", &"DExchange".into()));
        assert!(!known.is_exchange("ark.devnet", &"DTeam".into()));
        assert!(known.is_team("ark.devnet", &"DTeam".into()));
        assert!(!known.is_known("ark.devnet", &"DNobody".into()));
    }
}
