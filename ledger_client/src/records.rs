//! Request and response shapes exchanged with the ledger node.
//!
//! Amounts stay in their ledger-native integer form (decimal strings) at this
//! layer; the engine scales them with [`coffer_types::DecimalValue`].

use coffer_types::{Address, MultiSignatureDescriptor, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Wallets ─────────────────────────────────────────────────────────────

/// How a wallet is identified in a lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Address,
    PublicKey,
    ExtendedPublicKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletIdentifier {
    #[serde(rename = "type")]
    pub kind: IdentifierKind,
    pub value: String,
    /// Derivation method for extended keys (e.g. `bip44`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl WalletIdentifier {
    pub fn address(address: &Address) -> Self {
        Self {
            kind: IdentifierKind::Address,
            value: address.to_string(),
            method: None,
        }
    }

    pub fn public_key(key: &PublicKey) -> Self {
        Self {
            kind: IdentifierKind::PublicKey,
            value: key.to_string(),
            method: None,
        }
    }

    pub fn extended_public_key(key: &PublicKey, method: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::ExtendedPublicKey,
            value: key.to_string(),
            method: Some(method.into()),
        }
    }
}

/// Whether the node produced a usable record for the lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Passed,
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBalance {
    #[serde(default)]
    pub available: String,
    #[serde(default)]
    pub fees: String,
}

/// A wallet as the ledger sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub address: Address,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
    #[serde(default)]
    pub balance: RawBalance,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_validator: bool,
    #[serde(default)]
    pub is_resigned_validator: bool,
    #[serde(default)]
    pub multi_signature: Option<MultiSignatureDescriptor>,
    #[serde(default)]
    pub second_public_key: Option<PublicKey>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl WalletRecord {
    /// A passed record carrying only an address; fields default to empty.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            public_key: None,
            balance: RawBalance::default(),
            nonce: String::new(),
            username: None,
            is_validator: false,
            is_resigned_validator: false,
            multi_signature: None,
            second_public_key: None,
            status: RecordStatus::Passed,
        }
    }

    pub fn has_passed(&self) -> bool {
        self.status == RecordStatus::Passed
    }

    pub fn has_failed(&self) -> bool {
        self.status == RecordStatus::Failed
    }

    pub fn is_multi_signature(&self) -> bool {
        self.multi_signature.is_some()
    }

    pub fn is_second_signature(&self) -> bool {
        self.second_public_key.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReport {
    /// Votes still available to cast.
    pub available: u32,
    /// Validator identifiers currently voted for.
    #[serde(default)]
    pub votes: Vec<String>,
    pub used: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub contract_address: Address,
    /// Raw balance in the token's smallest unit.
    pub balance: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub contract_address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

// ── Transactions ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[default]
    Transfer,
    MultiPayment,
    SecondSignature,
    ValidatorRegistration,
    ValidatorResignation,
    Vote,
    MultiSignatureRegistration,
    Ipfs,
    HtlcLock,
    HtlcClaim,
    HtlcRefund,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecipient {
    pub address: Address,
    pub amount: String,
}

/// Hints attached to a transaction after it was fetched for a wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    pub address: Option<Address>,
    pub public_key: Option<PublicKey>,
    pub hints: BTreeMap<String, String>,
}

/// A confirmed transaction as returned by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub confirmations: u64,
    pub sender: Address,
    #[serde(default)]
    pub sender_public_key: Option<PublicKey>,
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub fee: String,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub recipients: Vec<RawRecipient>,
    #[serde(skip)]
    pub meta: TransactionMeta,
}

impl RawTransaction {
    /// Tag the transaction with the wallet it was fetched for.
    pub fn set_wallet_meta(&mut self, address: Address, public_key: Option<PublicKey>) {
        self.meta.address = Some(address);
        self.meta.public_key = public_key;
    }

    pub fn set_hint(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.hints.insert(key.into(), value.into());
    }

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.meta.hints.get(key).map(String::as_str)
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionKind::Transfer
    }

    pub fn is_multi_payment(&self) -> bool {
        self.kind == TransactionKind::MultiPayment
    }

    fn is_own_address(&self, address: &Address) -> bool {
        self.meta.address.as_ref() == Some(address)
    }

    /// Sent by the tagged wallet, matched by address or public key.
    pub fn is_sent(&self) -> bool {
        if self.is_own_address(&self.sender) {
            return true;
        }
        match (&self.meta.public_key, &self.sender_public_key) {
            (Some(ours), Some(sender)) => ours == sender,
            _ => false,
        }
    }

    pub fn is_received(&self) -> bool {
        if let Some(recipient) = &self.recipient {
            if self.is_own_address(recipient) {
                return true;
            }
        }
        self.recipients.iter().any(|r| self.is_own_address(&r.address))
    }

    /// Sent by the tagged wallet to itself. Only transfers and
    /// multi-payments move value, so no other kind is ever a return.
    pub fn is_return(&self) -> bool {
        match self.kind {
            TransactionKind::Transfer => self.is_sent() && self.is_received(),
            TransactionKind::MultiPayment => {
                self.is_sent()
                    && !self.recipients.is_empty()
                    && self.recipients.iter().all(|r| self.is_own_address(&r.address))
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<WalletIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl TransactionQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub prev: Option<u32>,
    #[serde(default, rename = "self")]
    pub current: Option<u32>,
    #[serde(default)]
    pub next: Option<u32>,
    #[serde(default)]
    pub last: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionPage {
    pub items: Vec<RawTransaction>,
    pub pagination: Pagination,
}

impl TransactionPage {
    pub fn new(items: Vec<RawTransaction>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }

    pub fn items(&self) -> &[RawTransaction] {
        &self.items
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

// ── Signed, not yet confirmed ───────────────────────────────────────────

/// A signature over a multi-signature transaction, by participant index in
/// the descriptor's flattened key list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSignature {
    pub index: u32,
    pub signature: String,
}

/// A transaction signed locally or collected from the multi-signature
/// coordination endpoint, not yet accepted by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: TransactionKind,
    pub sender: Address,
    pub sender_public_key: PublicKey,
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub fee: String,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    /// Present when the transaction needs several signers.
    #[serde(default)]
    pub multi_signature: Option<MultiSignatureDescriptor>,
    #[serde(default)]
    pub signatures: Vec<ParticipantSignature>,
    /// The sender's closing signature over the collected signatures.
    #[serde(default)]
    pub final_signature: Option<String>,
}

impl SignedTransaction {
    pub fn uses_multi_signature(&self) -> bool {
        self.multi_signature.is_some()
    }
}
