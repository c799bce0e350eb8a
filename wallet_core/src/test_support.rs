//! Shared fixtures for unit tests.

use coffer_ledger_client::{
    RawBalance, RawTransaction, SignedTransaction, TransactionKind, TransactionMeta, WalletRecord,
};
use coffer_nullables::{NullExchangeRates, NullLedgerClient};
use coffer_types::{DecimalValue, MultiSignatureDescriptor, NetworkProfile, PublicKey};
use std::sync::Arc;

use crate::data::ImportMethod;
use crate::wallet::{Wallet, WalletServices};
use coffer_ledger_client::KnownWallets;

pub(crate) const ADDRESS: &str = "D61mfSggzbvQgTUe6JhYKH2doHaqJ3Dyib";
pub(crate) const PUBLIC_KEY: &str = "03a02b9d5fdd1307c2ee4652ba54d492d1fd11a7d1bb3f3a44c4a05e79f19de933";
pub(crate) const OTHER: &str = "DJmvhhiQFSrEQCq7ZKHm5SBDw2sDKqtKGs";

pub(crate) fn wallet_with(client: Arc<NullLedgerClient>) -> Wallet {
    let services = WalletServices::new(
        Arc::new(NullExchangeRates::new(DecimalValue::from(2u64))),
        Arc::new(KnownWallets::default()),
    );
    let wallet = Wallet::new(
        ADDRESS.into(),
        NetworkProfile::default(),
        ImportMethod::Address,
        services,
    );
    wallet.mutator().ledger_client(client);
    wallet
}

pub(crate) fn record() -> WalletRecord {
    let mut record = WalletRecord::new(ADDRESS.into());
    record.public_key = Some(PUBLIC_KEY.into());
    record.balance = RawBalance {
        available: "150000000".into(),
        fees: "0".into(),
    };
    record.nonce = "7".into();
    record
}

pub(crate) fn multisig_record(descriptor: MultiSignatureDescriptor) -> WalletRecord {
    let mut record = record();
    record.multi_signature = Some(descriptor);
    record
}

pub(crate) fn simple(min: u32, keys: &[&str]) -> MultiSignatureDescriptor {
    MultiSignatureDescriptor::Simple {
        min,
        public_keys: keys.iter().map(|k| PublicKey::from(*k)).collect(),
    }
}

pub(crate) fn raw(id: &str, sender: &str, recipient: &str, amount: &str, fee: &str) -> RawTransaction {
    RawTransaction {
        id: id.into(),
        kind: TransactionKind::Transfer,
        block_id: None,
        timestamp: None,
        confirmations: 1,
        sender: sender.into(),
        sender_public_key: None,
        recipient: Some(recipient.into()),
        amount: amount.into(),
        fee: fee.into(),
        nonce: None,
        memo: None,
        recipients: Vec::new(),
        meta: TransactionMeta::default(),
    }
}

pub(crate) fn signed(id: &str) -> SignedTransaction {
    SignedTransaction {
        id: id.into(),
        kind: TransactionKind::Transfer,
        sender: ADDRESS.into(),
        sender_public_key: PUBLIC_KEY.into(),
        recipient: Some(OTHER.into()),
        amount: "100000000".into(),
        fee: "10000000".into(),
        timestamp: None,
        multi_signature: None,
        signatures: Vec::new(),
        final_signature: None,
    }
}
