//! Wallet engine for Coffer.
//!
//! Keeps a locally held wallet consistent with a remote ledger node:
//! - Identity, vote and token synchronisation that survives failed lookups
//! - Multi-signature quorum resolution over simple and advanced signer sets
//! - Confirmed-transaction aggregation with totals and currency conversion
//! - Reconciliation of locally signed and in-flight multi-signature transactions
//! - A cancellable periodic poll publishing the pending transaction set

pub mod data;
pub mod error;
pub mod keystore;
pub mod multi_signature;
pub mod mutator;
pub mod pending;
pub mod synchroniser;
pub mod transaction;
pub mod transaction_index;
pub mod transaction_service;
pub mod wallet;

pub use data::{
    Derivation, ImportMethod, Restoration, VotingState, WalletBalance, WalletStatus, WalletToken,
};
pub use error::WalletError;
pub use keystore::KeystoreFile;
pub use multi_signature::{MultiSignatureStatus, ReadOnlyWallet, WalletMultiSignature};
pub use mutator::WalletMutator;
pub use pending::{
    PendingState, PendingSyncHandle, PendingTransaction, WalletTransactions,
    DEFAULT_PENDING_SYNC_INTERVAL,
};
pub use synchroniser::{IdentitySync, TokenSyncReport, WalletSynchroniser};
pub use transaction::{ConfirmedTransaction, ConfirmedTransactionCollection, Recipient};
pub use transaction_index::TransactionIndex;
pub use transaction_service::{TransactionService, TransactionSyncReport};
pub use wallet::{Wallet, WalletId, WalletIdentity, WalletServices};

#[cfg(test)]
mod test_support;
