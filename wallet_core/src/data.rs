//! Persisted wallet fields and the small value types around them.

use coffer_types::{Address, DecimalValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the wallet has been observed spending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Hot,
    #[default]
    Cold,
}

/// How far the wallet has been restored from the ledger.
///
/// `Pending` until a ledger client is attached or an identity sync has run;
/// afterwards exactly one of [`Restoration::full`] and
/// [`Restoration::partial`] holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Restoration {
    #[default]
    Pending,
    Partial,
    Full,
}

impl Restoration {
    pub fn full(&self) -> bool {
        *self == Self::Full
    }

    pub fn partial(&self) -> bool {
        *self == Self::Partial
    }
}

/// Mnemonic derivation scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Derivation {
    Bip39,
    Bip44,
    Bip49,
    Bip84,
}

impl Derivation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bip39 => "bip39",
            Self::Bip44 => "bip44",
            Self::Bip49 => "bip49",
            Self::Bip84 => "bip84",
        }
    }
}

/// How the wallet was imported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportMethod {
    Address,
    PublicKey,
    PrivateKey { encrypted: bool },
    Mnemonic { derivation: Derivation, encrypted: bool },
    Wif { encrypted: bool },
    Secret { encrypted: bool },
}

impl ImportMethod {
    pub fn is_encrypted(&self) -> bool {
        match self {
            Self::Address | Self::PublicKey => false,
            Self::PrivateKey { encrypted }
            | Self::Mnemonic { encrypted, .. }
            | Self::Wif { encrypted }
            | Self::Secret { encrypted } => *encrypted,
        }
    }

    /// Watch-only imports cannot sign.
    pub fn can_sign(&self) -> bool {
        !matches!(self, Self::Address | Self::PublicKey)
    }

    /// Derivation method handed to the ledger for extended-key lookups.
    pub fn derivation(&self) -> Option<Derivation> {
        match self {
            Self::Mnemonic { derivation, .. } => Some(*derivation),
            _ => None,
        }
    }

    fn with_encrypted(self, value: bool) -> Option<Self> {
        match self {
            Self::Address | Self::PublicKey => None,
            Self::PrivateKey { .. } => Some(Self::PrivateKey { encrypted: value }),
            Self::Mnemonic { derivation, .. } => Some(Self::Mnemonic {
                derivation,
                encrypted: value,
            }),
            Self::Wif { .. } => Some(Self::Wif { encrypted: value }),
            Self::Secret { .. } => Some(Self::Secret { encrypted: value }),
        }
    }

    /// The "with encryption" variant, or `None` for watch-only imports.
    pub fn encrypted(self) -> Option<Self> {
        self.with_encrypted(true)
    }

    /// The plain variant of this import method.
    pub fn decrypted(self) -> Self {
        self.with_encrypted(false).unwrap_or(self)
    }
}

impl fmt::Display for ImportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self {
            Self::Address => "address",
            Self::PublicKey => "public_key",
            Self::PrivateKey { .. } => "private_key",
            Self::Mnemonic { derivation, .. } => derivation.as_str(),
            Self::Wif { .. } => "wif",
            Self::Secret { .. } => "secret",
        };
        if self.is_encrypted() {
            write!(f, "{base}_with_encryption")
        } else {
            f.write_str(base)
        }
    }
}

/// Ledger-observed balance, already scaled to human units.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub available: DecimalValue,
    pub fees: DecimalValue,
}

impl WalletBalance {
    pub fn total(&self) -> DecimalValue {
        self.available.clone() + self.fees.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingState {
    pub available: u32,
    pub votes: Vec<String>,
    pub used: u32,
}

/// A token held by the wallet, with resolved metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletToken {
    pub contract_address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub balance: DecimalValue,
}
