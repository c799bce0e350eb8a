//! The ledger client seam.

use async_trait::async_trait;
use coffer_types::{Address, PublicKey};

use crate::records::{
    RawTransaction, SignedTransaction, TokenBalance, TokenMetadata, TransactionPage,
    TransactionQuery, VoteReport, WalletIdentifier, WalletRecord,
};
use crate::LedgerError;

/// Queries the wallet engine issues against a remote ledger node.
///
/// Every method is a suspension point. Timeouts and retries are the
/// implementation's business; the engine never imposes its own.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Look up a wallet. A wallet unknown to the node is
    /// [`LedgerError::NotFound`].
    async fn wallet(&self, identifier: &WalletIdentifier) -> Result<WalletRecord, LedgerError>;

    async fn transactions(&self, query: &TransactionQuery) -> Result<TransactionPage, LedgerError>;

    async fn transaction(&self, id: &str) -> Result<RawTransaction, LedgerError>;

    async fn votes(&self, address: &Address) -> Result<VoteReport, LedgerError>;

    async fn tokens(&self, address: &Address) -> Result<Vec<TokenBalance>, LedgerError>;

    async fn token_by_contract_address(
        &self,
        contract_address: &Address,
    ) -> Result<TokenMetadata, LedgerError>;

    /// Multi-signature transactions awaiting signatures that involve `public_key`.
    async fn pending_multi_signatures(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<SignedTransaction>, LedgerError>;

    /// Complete a fetched transaction with data the list endpoint omits.
    ///
    /// Most ledgers return complete records, so the default is a no-op.
    async fn normalize_transaction(
        &self,
        transaction: RawTransaction,
    ) -> Result<RawTransaction, LedgerError> {
        Ok(transaction)
    }
}
