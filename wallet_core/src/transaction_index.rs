//! Confirmed-transaction lookups for one wallet.

use coffer_ledger_client::{TransactionQuery, TransactionPage};
use futures_util::future::try_join_all;

use crate::error::WalletError;
use crate::transaction::{self, ConfirmedTransaction, ConfirmedTransactionCollection};
use crate::wallet::Wallet;

pub struct TransactionIndex<'a> {
    wallet: &'a Wallet,
}

impl<'a> TransactionIndex<'a> {
    pub(crate) fn new(wallet: &'a Wallet) -> Self {
        Self { wallet }
    }

    /// Every transaction involving the wallet. `query` supplies paging and
    /// time bounds; the wallet identifier is filled in.
    pub async fn all(
        &self,
        mut query: TransactionQuery,
    ) -> Result<ConfirmedTransactionCollection, WalletError> {
        query.identifiers = vec![self.wallet.ledger_identifier()];
        self.fetch(query).await
    }

    pub async fn sent(
        &self,
        mut query: TransactionQuery,
    ) -> Result<ConfirmedTransactionCollection, WalletError> {
        query.sender = Some(self.wallet.address());
        self.fetch(query).await
    }

    pub async fn received(
        &self,
        mut query: TransactionQuery,
    ) -> Result<ConfirmedTransactionCollection, WalletError> {
        query.recipient = Some(self.wallet.address());
        self.fetch(query).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<ConfirmedTransaction, WalletError> {
        let client = self.wallet.ledger_client()?;
        let mut raw = client.transaction(id).await?;
        raw.set_wallet_meta(self.wallet.address(), self.wallet.public_key());
        transaction::transform(self.wallet, raw)
    }

    /// All of `ids`, in order. Fails if any one lookup fails.
    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<ConfirmedTransaction>, WalletError> {
        try_join_all(ids.iter().map(|id| self.find_by_id(id))).await
    }

    /// Fetch a page, tag it with the wallet, flag the wallet Hot if it has
    /// spent, and wrap the items.
    async fn fetch(
        &self,
        query: TransactionQuery,
    ) -> Result<ConfirmedTransactionCollection, WalletError> {
        let client = self.wallet.ledger_client()?;
        let TransactionPage { mut items, pagination } = client.transactions(&query).await?;

        let address = self.wallet.address();
        let public_key = self.wallet.public_key();
        for item in &mut items {
            item.set_wallet_meta(address.clone(), public_key.clone());
        }

        if items.iter().any(|tx| tx.is_sent() || tx.is_return()) && self.wallet.mark_hot_if_cold() {
            tracing::info!(%address, "outgoing transaction observed, wallet is now hot");
        }

        tracing::debug!(%address, count = items.len(), "fetched transactions");
        transaction::transform_collection(self.wallet, TransactionPage::new(items, pagination)).await
    }
}
