//! Confirmed transactions as seen from one wallet.
//!
//! [`transform`] wraps a raw ledger transaction with the owning wallet's view
//! of it: human-unit amounts, the wallet-relative total and fiat conversion.

use coffer_ledger_client::{
    ExchangeRateConverter, KnownWalletService, Pagination, RawTransaction, TransactionKind,
    TransactionMeta, TransactionPage,
};
use coffer_types::{Address, DecimalValue, PublicKey, Timestamp};
use futures_util::future::join_all;
use std::sync::Weak;

use crate::error::WalletError;
use crate::wallet::{Wallet, WalletInner, WalletServices};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub address: Address,
    pub amount: DecimalValue,
}

#[derive(Clone)]
pub struct ConfirmedTransaction {
    raw: RawTransaction,
    wallet: Weak<WalletInner>,
    network: String,
    currency: String,
    exchange_currency: String,
    services: WalletServices,
    amount: DecimalValue,
    fee: DecimalValue,
    recipients: Vec<Recipient>,
    total: DecimalValue,
}

/// Wrap `raw` for `wallet`. Tags the transaction with the wallet's address
/// and public key unless it already carries them.
pub fn transform(wallet: &Wallet, mut raw: RawTransaction) -> Result<ConfirmedTransaction, WalletError> {
    if raw.meta.address.is_none() {
        raw.set_wallet_meta(wallet.address(), wallet.public_key());
    }
    let decimals = wallet.network().decimals;
    let amount = DecimalValue::from_raw_str(&raw.amount, decimals)?;
    let fee = DecimalValue::from_raw_str(&raw.fee, decimals)?;
    let recipients = raw
        .recipients
        .iter()
        .map(|r| {
            Ok(Recipient {
                address: r.address.clone(),
                amount: DecimalValue::from_raw_str(&r.amount, decimals)?,
            })
        })
        .collect::<Result<Vec<_>, WalletError>>()?;
    let total = total(&raw, &amount, &fee, &recipients);

    Ok(ConfirmedTransaction {
        wallet: wallet.downgrade(),
        network: wallet.network().id.clone(),
        currency: wallet.currency().to_string(),
        exchange_currency: wallet.exchange_currency(),
        services: wallet.services().clone(),
        raw,
        amount,
        fee,
        recipients,
        total,
    })
}

/// The amount this transaction moved for the tagged wallet.
///
/// - a return costs only the fee: `amount - fee`
/// - a sent transaction costs `amount + fee`
/// - otherwise `amount`, less every multi-payment leg addressed elsewhere
pub fn total(
    raw: &RawTransaction,
    amount: &DecimalValue,
    fee: &DecimalValue,
    recipients: &[Recipient],
) -> DecimalValue {
    if raw.is_return() {
        return amount.clone() - fee;
    }
    if raw.is_sent() {
        return amount.clone() + fee.clone();
    }
    if !raw.is_multi_payment() {
        return amount.clone();
    }
    let own = raw.meta.address.as_ref();
    recipients
        .iter()
        .filter(|r| Some(&r.address) != own)
        .fold(amount.clone(), |total, r| total - &r.amount)
}

/// Normalise every item through the ledger client, then wrap it.
///
/// A failed normalisation keeps the item as fetched; an item that cannot be
/// wrapped is left out. Neither aborts the collection.
pub async fn transform_collection(
    wallet: &Wallet,
    page: TransactionPage,
) -> Result<ConfirmedTransactionCollection, WalletError> {
    let client = wallet.ledger_client()?;
    let TransactionPage { items, pagination } = page;

    let normalized = join_all(items.into_iter().map(|raw| {
        let client = client.clone();
        async move {
            let meta = raw.meta.clone();
            let fallback = raw.clone();
            let mut item = match client.normalize_transaction(raw).await {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(transaction = %fallback.id, error = %e, "normalisation failed, keeping transaction as fetched");
                    fallback
                }
            };
            restore_meta(&mut item, meta);
            item
        }
    }))
    .await;

    let items = normalized
        .into_iter()
        .filter_map(|raw| {
            let id = raw.id.clone();
            transform(wallet, raw)
                .map_err(|e| tracing::warn!(transaction = %id, error = %e, "dropping transaction"))
                .ok()
        })
        .collect();

    Ok(ConfirmedTransactionCollection { items, pagination })
}

/// Normalisers may rebuild the record; keep what was tagged before.
fn restore_meta(item: &mut RawTransaction, meta: TransactionMeta) {
    if item.meta.address.is_none() {
        item.meta.address = meta.address;
        item.meta.public_key = meta.public_key;
    }
    for (key, value) in meta.hints {
        item.meta.hints.entry(key).or_insert(value);
    }
}

impl ConfirmedTransaction {
    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn raw(&self) -> &RawTransaction {
        &self.raw
    }

    pub fn kind(&self) -> TransactionKind {
        self.raw.kind
    }

    pub fn block_id(&self) -> Option<&str> {
        self.raw.block_id.as_deref()
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.raw.timestamp
    }

    pub fn confirmations(&self) -> u64 {
        self.raw.confirmations
    }

    pub fn is_confirmed(&self) -> bool {
        self.raw.confirmations > 0
    }

    pub fn sender(&self) -> &Address {
        &self.raw.sender
    }

    pub fn sender_public_key(&self) -> Option<&PublicKey> {
        self.raw.sender_public_key.as_ref()
    }

    pub fn recipient(&self) -> Option<&Address> {
        self.raw.recipient.as_ref()
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn memo(&self) -> Option<&str> {
        self.raw.memo.as_deref()
    }

    pub fn amount(&self) -> DecimalValue {
        self.amount.clone()
    }

    pub fn fee(&self) -> DecimalValue {
        self.fee.clone()
    }

    pub fn total(&self) -> DecimalValue {
        self.total.clone()
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.raw.hint(key)
    }

    pub fn is_sent(&self) -> bool {
        self.raw.is_sent()
    }

    pub fn is_received(&self) -> bool {
        self.raw.is_received()
    }

    pub fn is_return(&self) -> bool {
        self.raw.is_return()
    }

    pub fn is_transfer(&self) -> bool {
        self.raw.is_transfer()
    }

    pub fn is_multi_payment(&self) -> bool {
        self.raw.is_multi_payment()
    }

    /// The owning wallet, if it is still alive.
    pub fn wallet(&self) -> Option<Wallet> {
        Wallet::from_weak(&self.wallet)
    }

    pub fn sender_known_name(&self) -> Option<String> {
        self.services.known_wallets.name(&self.network, &self.raw.sender)
    }

    pub fn recipient_known_name(&self) -> Option<String> {
        self.raw
            .recipient
            .as_ref()
            .and_then(|r| self.services.known_wallets.name(&self.network, r))
    }

    pub async fn converted_amount(&self) -> DecimalValue {
        self.convert(self.amount.clone()).await
    }

    pub async fn converted_fee(&self) -> DecimalValue {
        self.convert(self.fee.clone()).await
    }

    pub async fn converted_total(&self) -> DecimalValue {
        self.convert(self.total.clone()).await
    }

    /// Target currency of conversions: the wallet's current setting, or the
    /// one it had at wrap time once the wallet is gone.
    pub fn exchange_currency(&self) -> String {
        self.wallet()
            .map(|wallet| wallet.exchange_currency())
            .unwrap_or_else(|| self.exchange_currency.clone())
    }

    /// Zero without a timestamp: there is no day to take a rate from.
    async fn convert(&self, value: DecimalValue) -> DecimalValue {
        let Some(timestamp) = self.raw.timestamp else {
            return DecimalValue::ZERO;
        };
        let exchange_currency = self.exchange_currency();
        self.services
            .exchange_rates
            .exchange(&self.currency, &exchange_currency, timestamp, value)
            .await
    }
}

impl std::fmt::Debug for ConfirmedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmedTransaction")
            .field("id", &self.raw.id)
            .field("kind", &self.raw.kind)
            .field("amount", &self.amount)
            .field("fee", &self.fee)
            .field("total", &self.total)
            .finish()
    }
}

/// One page of confirmed transactions.
#[derive(Clone, Debug, Default)]
pub struct ConfirmedTransactionCollection {
    items: Vec<ConfirmedTransaction>,
    pagination: Pagination,
}

impl ConfirmedTransactionCollection {
    pub fn items(&self) -> &[ConfirmedTransaction] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ConfirmedTransaction> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfirmedTransaction> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn next_page(&self) -> Option<u32> {
        self.pagination.next
    }

    pub fn has_more(&self) -> bool {
        self.pagination.next.is_some()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ConfirmedTransaction> {
        self.items.iter().find(|tx| tx.id() == id)
    }
}

impl<'a> IntoIterator for &'a ConfirmedTransactionCollection {
    type Item = &'a ConfirmedTransaction;
    type IntoIter = std::slice::Iter<'a, ConfirmedTransaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
