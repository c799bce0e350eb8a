use coffer_ledger_client::LedgerError;
use coffer_types::{Address, TypesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet has not been synchronized yet; run synchroniser().identity() first")]
    NotSynchronized,

    #[error("wallet does not have a multi-signature registered")]
    NotRegistered,

    #[error("ledger lookup for {address} failed: {source}")]
    LedgerLookupFailed {
        address: Address,
        source: LedgerError,
    },

    #[error("token {contract_address} could not be synchronized: {source}")]
    PartialTokenSyncFailure {
        contract_address: Address,
        source: LedgerError,
    },

    #[error("multi-signature readiness check failed: {0}")]
    MultiSignatureReadinessCheckFailed(String),

    #[error("password does not decrypt the stored keys")]
    EncryptionVerificationFailed,

    #[error("no ledger client attached to this wallet")]
    NoLedgerClient,

    #[error("transaction {0} not found")]
    TransactionNotFound(String),

    #[error("import method {0} cannot hold encrypted keys")]
    UnsupportedEncryption(String),

    #[error("wallet is not encrypted")]
    NotEncrypted,

    #[error("key error: {0}")]
    Key(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("amount error: {0}")]
    Amount(#[from] TypesError),
}

impl WalletError {
    /// A lookup failure where the node positively answered "not found".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::LedgerLookupFailed { source, .. } | Self::Ledger(source) => source.is_not_found(),
            Self::TransactionNotFound(_) => true,
            _ => false,
        }
    }
}
