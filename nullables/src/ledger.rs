//! Nullable ledger node: programmable answers, recorded calls.

use async_trait::async_trait;
use coffer_ledger_client::{
    LedgerClient, LedgerError, Pagination, RawTransaction, SignedTransaction, TokenBalance,
    TokenMetadata, TransactionPage, TransactionQuery, VoteReport, WalletIdentifier, WalletRecord,
};
use coffer_types::{Address, PublicKey};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// An in-memory ledger node for tests.
///
/// Lookups that were never programmed answer [`LedgerError::NotFound`].
#[derive(Default)]
pub struct NullLedgerClient {
    wallets: Mutex<HashMap<String, Result<WalletRecord, LedgerError>>>,
    transactions: Mutex<Vec<RawTransaction>>,
    pagination: Mutex<Pagination>,
    transactions_error: Mutex<Option<LedgerError>>,
    confirmed: Mutex<HashMap<String, RawTransaction>>,
    votes: Mutex<HashMap<Address, Result<VoteReport, LedgerError>>>,
    tokens: Mutex<HashMap<Address, Vec<TokenBalance>>>,
    token_metadata: Mutex<HashMap<Address, Result<TokenMetadata, LedgerError>>>,
    pending: Mutex<HashMap<PublicKey, Vec<SignedTransaction>>>,
    pending_error: Mutex<Option<LedgerError>>,
    normalize_failures: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    queries: Mutex<Vec<TransactionQuery>>,
}

impl NullLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Answer wallet lookups for `identifier_value` with `record`.
    pub fn set_wallet(&self, identifier_value: impl Into<String>, record: WalletRecord) {
        self.wallets
            .lock()
            .unwrap()
            .insert(identifier_value.into(), Ok(record));
    }

    /// Answer wallet lookups for `identifier_value` with `error`.
    pub fn fail_wallet(&self, identifier_value: impl Into<String>, error: LedgerError) {
        self.wallets
            .lock()
            .unwrap()
            .insert(identifier_value.into(), Err(error));
    }

    pub fn set_transactions(&self, items: Vec<RawTransaction>) {
        *self.transactions.lock().unwrap() = items;
    }

    pub fn set_pagination(&self, pagination: Pagination) {
        *self.pagination.lock().unwrap() = pagination;
    }

    pub fn fail_transactions(&self, error: Option<LedgerError>) {
        *self.transactions_error.lock().unwrap() = error;
    }

    /// Make `transaction(id)` find this transaction.
    pub fn confirm(&self, transaction: RawTransaction) {
        self.confirmed
            .lock()
            .unwrap()
            .insert(transaction.id.clone(), transaction);
    }

    pub fn set_votes(&self, address: Address, report: VoteReport) {
        self.votes.lock().unwrap().insert(address, Ok(report));
    }

    pub fn fail_votes(&self, address: Address, error: LedgerError) {
        self.votes.lock().unwrap().insert(address, Err(error));
    }

    pub fn set_tokens(&self, address: Address, balances: Vec<TokenBalance>) {
        self.tokens.lock().unwrap().insert(address, balances);
    }

    pub fn set_token_metadata(&self, metadata: TokenMetadata) {
        self.token_metadata
            .lock()
            .unwrap()
            .insert(metadata.contract_address.clone(), Ok(metadata));
    }

    pub fn fail_token_metadata(&self, contract_address: Address, error: LedgerError) {
        self.token_metadata
            .lock()
            .unwrap()
            .insert(contract_address, Err(error));
    }

    pub fn set_pending_multi_signatures(
        &self,
        public_key: PublicKey,
        transactions: Vec<SignedTransaction>,
    ) {
        self.pending.lock().unwrap().insert(public_key, transactions);
    }

    pub fn fail_pending_multi_signatures(&self, error: Option<LedgerError>) {
        *self.pending_error.lock().unwrap() = error;
    }

    /// Make `normalize_transaction` fail for the given transaction id.
    pub fn fail_normalize(&self, id: impl Into<String>) {
        self.normalize_failures.lock().unwrap().insert(id.into());
    }

    /// Names of the calls received so far, e.g. `"wallet:D1"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Transaction queries received so far.
    pub fn queries(&self) -> Vec<TransactionQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for NullLedgerClient {
    async fn wallet(&self, identifier: &WalletIdentifier) -> Result<WalletRecord, LedgerError> {
        self.record(format!("wallet:{}", identifier.value));
        self.wallets
            .lock()
            .unwrap()
            .get(&identifier.value)
            .cloned()
            .unwrap_or_else(|| Err(LedgerError::NotFound(identifier.value.clone())))
    }

    async fn transactions(&self, query: &TransactionQuery) -> Result<TransactionPage, LedgerError> {
        self.record("transactions");
        self.queries.lock().unwrap().push(query.clone());
        if let Some(error) = self.transactions_error.lock().unwrap().clone() {
            return Err(error);
        }
        let items = self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| query.sender.as_ref().map_or(true, |s| &t.sender == s))
            .filter(|t| {
                query.recipient.as_ref().map_or(true, |r| {
                    t.recipient.as_ref() == Some(r) || t.recipients.iter().any(|p| &p.address == r)
                })
            })
            .cloned()
            .collect();
        Ok(TransactionPage::new(
            items,
            self.pagination.lock().unwrap().clone(),
        ))
    }

    async fn transaction(&self, id: &str) -> Result<RawTransaction, LedgerError> {
        self.record(format!("transaction:{id}"));
        self.confirmed
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    async fn votes(&self, address: &Address) -> Result<VoteReport, LedgerError> {
        self.record(format!("votes:{address}"));
        self.votes
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| Err(LedgerError::NotFound(address.to_string())))
    }

    async fn tokens(&self, address: &Address) -> Result<Vec<TokenBalance>, LedgerError> {
        self.record(format!("tokens:{address}"));
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn token_by_contract_address(
        &self,
        contract_address: &Address,
    ) -> Result<TokenMetadata, LedgerError> {
        self.record(format!("token:{contract_address}"));
        self.token_metadata
            .lock()
            .unwrap()
            .get(contract_address)
            .cloned()
            .unwrap_or_else(|| Err(LedgerError::NotFound(contract_address.to_string())))
    }

    async fn pending_multi_signatures(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<SignedTransaction>, LedgerError> {
        self.record(format!("pending:{public_key}"));
        if let Some(error) = self.pending_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .pending
            .lock()
            .unwrap()
            .get(public_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn normalize_transaction(
        &self,
        transaction: RawTransaction,
    ) -> Result<RawTransaction, LedgerError> {
        self.record(format!("normalize:{}", transaction.id));
        if self.normalize_failures.lock().unwrap().contains(&transaction.id) {
            return Err(LedgerError::InvalidResponse(format!(
                "cannot normalize {}",
                transaction.id
            )));
        }
        let mut normalized = transaction;
        normalized.set_hint("normalized", "true");
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unprogrammed_wallet_is_not_found() {
        let ledger = NullLedgerClient::new();
        let err = ledger
            .wallet(&WalletIdentifier::address(&"D1".into()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(ledger.calls(), vec!["wallet:D1".to_string()]);
    }

    #[tokio::test]
    async fn programmed_wallet_is_returned() {
        let ledger = NullLedgerClient::new();
        ledger.set_wallet("D1", WalletRecord::new("D1".into()));
        let record = ledger
            .wallet(&WalletIdentifier::address(&"D1".into()))
            .await
            .unwrap();
        assert_eq!(record.address, Address::from("D1"));
    }

    #[tokio::test]
    async fn pending_failure_can_be_toggled() {
        let ledger = NullLedgerClient::new();
        ledger.fail_pending_multi_signatures(Some(LedgerError::Unreachable("down".into())));
        assert!(ledger.pending_multi_signatures(&"pk".into()).await.is_err());
        ledger.fail_pending_multi_signatures(None);
        assert!(ledger.pending_multi_signatures(&"pk".into()).await.unwrap().is_empty());
    }
}
