//! Wallet-internal state of transactions that are signed but not yet
//! confirmed: locally signed transfers, broadcasts awaiting confirmation and
//! multi-signature transactions collected from the ledger's coordinator.

use coffer_ledger_client::SignedTransaction;
use std::collections::{BTreeMap, HashSet};

use crate::error::WalletError;
use crate::multi_signature::{self, MultiSignatureStatus};
use crate::wallet::Wallet;

#[derive(Clone, Debug)]
pub(crate) struct TrackedTransaction {
    pub(crate) tx: SignedTransaction,
    pub(crate) signed_locally: bool,
    pub(crate) broadcasted: bool,
    pub(crate) from_coordinator: bool,
}

#[derive(Debug, Default)]
pub(crate) struct TransactionState {
    entries: BTreeMap<String, TrackedTransaction>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionSyncReport {
    /// Broadcast transactions the ledger now knows; no longer tracked.
    pub confirmed: Vec<String>,
    /// Transactions still tracked after the sync.
    pub pending: usize,
}

pub struct TransactionService<'a> {
    wallet: &'a Wallet,
}

impl<'a> TransactionService<'a> {
    pub(crate) fn new(wallet: &'a Wallet) -> Self {
        Self { wallet }
    }

    fn with_entry<T>(&self, id: &str, f: impl FnOnce(&TrackedTransaction) -> T) -> Option<T> {
        self.wallet.read().transactions.entries.get(id).map(f)
    }

    fn collect(&self, keep: impl Fn(&TrackedTransaction) -> bool) -> Vec<SignedTransaction> {
        self.wallet
            .read()
            .transactions
            .entries
            .values()
            .filter(|entry| keep(entry))
            .map(|entry| entry.tx.clone())
            .collect()
    }

    /// Track a transaction this wallet has signed. Returns its id.
    pub fn add_signed(&self, tx: SignedTransaction) -> String {
        let id = tx.id.clone();
        let mut state = self.wallet.write();
        let entry = state
            .transactions
            .entries
            .entry(id.clone())
            .or_insert_with(|| TrackedTransaction {
                tx: tx.clone(),
                signed_locally: true,
                broadcasted: false,
                from_coordinator: false,
            });
        entry.tx = tx;
        entry.signed_locally = true;
        tracing::debug!(transaction = %id, "tracking signed transaction");
        id
    }

    pub fn mark_broadcasted(&self, id: &str) -> Result<(), WalletError> {
        let mut state = self.wallet.write();
        let entry = state
            .transactions
            .entries
            .get_mut(id)
            .ok_or_else(|| WalletError::TransactionNotFound(id.to_string()))?;
        entry.broadcasted = true;
        Ok(())
    }

    /// Stop tracking a transaction. Returns whether it was tracked.
    pub fn forget(&self, id: &str) -> bool {
        self.wallet.write().transactions.entries.remove(id).is_some()
    }

    pub fn transaction(&self, id: &str) -> Option<SignedTransaction> {
        self.with_entry(id, |entry| entry.tx.clone())
    }

    pub fn ids(&self) -> Vec<String> {
        self.wallet.read().transactions.entries.keys().cloned().collect()
    }

    pub fn signed(&self) -> Vec<SignedTransaction> {
        self.collect(|entry| entry.signed_locally)
    }

    pub fn broadcasted(&self) -> Vec<SignedTransaction> {
        self.collect(|entry| entry.broadcasted)
    }

    pub fn multi_signatures(&self) -> Vec<SignedTransaction> {
        self.collect(|entry| entry.tx.uses_multi_signature())
    }

    pub fn waiting_for_our_signature(&self) -> Vec<SignedTransaction> {
        self.collect_status(MultiSignatureStatus::AwaitingOurSignature)
    }

    pub fn waiting_for_other_signatures(&self) -> Vec<SignedTransaction> {
        self.collect_status(MultiSignatureStatus::AwaitingOtherSignatures)
    }

    fn collect_status(&self, wanted: MultiSignatureStatus) -> Vec<SignedTransaction> {
        let key = self.wallet.public_key();
        self.collect(|entry| {
            entry.tx.uses_multi_signature()
                && multi_signature::status(&entry.tx, key.as_ref(), entry.broadcasted) == wanted
        })
    }

    /// Signed by this wallet, locally or as a multi-signature participant.
    pub fn has_been_signed(&self, id: &str) -> bool {
        let key = self.wallet.public_key();
        self.with_entry(id, |entry| {
            entry.signed_locally
                || key
                    .as_ref()
                    .is_some_and(|key| multi_signature::has_signed(&entry.tx, key))
        })
        .unwrap_or(false)
    }

    pub fn has_been_broadcasted(&self, id: &str) -> bool {
        self.with_entry(id, |entry| entry.broadcasted).unwrap_or(false)
    }

    /// Broadcast but not yet seen on the ledger.
    pub fn is_awaiting_confirmation(&self, id: &str) -> bool {
        self.has_been_broadcasted(id)
    }

    pub fn is_awaiting_our_signature(&self, id: &str) -> bool {
        self.status(id) == Some(MultiSignatureStatus::AwaitingOurSignature)
    }

    pub fn is_awaiting_other_signatures(&self, id: &str) -> bool {
        self.status(id) == Some(MultiSignatureStatus::AwaitingOtherSignatures)
    }

    pub fn is_awaiting_final_signature(&self, id: &str) -> bool {
        self.status(id) == Some(MultiSignatureStatus::AwaitingFinalSignature)
    }

    /// Quorum classification of a tracked multi-signature transaction.
    pub fn status(&self, id: &str) -> Option<MultiSignatureStatus> {
        let key = self.wallet.public_key();
        self.with_entry(id, |entry| {
            entry.tx.uses_multi_signature().then(|| {
                multi_signature::status(&entry.tx, key.as_ref(), entry.broadcasted)
            })
        })
        .flatten()
    }

    /// Reconcile with the ledger.
    ///
    /// Pulls the coordinator's pending multi-signature transactions for this
    /// wallet and checks every broadcast transaction for confirmation. The
    /// result is applied in one write once all calls have returned; any
    /// ledger error other than "not found" aborts without changes.
    pub async fn sync(&self) -> Result<TransactionSyncReport, WalletError> {
        let client = self.wallet.ledger_client()?;
        let pending = match self.wallet.public_key() {
            Some(key) => client.pending_multi_signatures(&key).await?,
            None => Vec::new(),
        };

        let broadcast_ids: Vec<String> = {
            let state = self.wallet.read();
            state
                .transactions
                .entries
                .iter()
                .filter(|(_, entry)| entry.broadcasted)
                .map(|(id, _)| id.clone())
                .collect()
        };
        let mut confirmed = Vec::new();
        for id in broadcast_ids {
            match client.transaction(&id).await {
                Ok(_) => confirmed.push(id),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut state = self.wallet.write();
        let entries = &mut state.transactions.entries;
        for id in &confirmed {
            entries.remove(id);
            tracing::info!(transaction = %id, "transaction confirmed");
        }

        let listed: HashSet<&str> = pending.iter().map(|tx| tx.id.as_str()).collect();
        entries.retain(|id, entry| {
            let keep = !entry.from_coordinator || entry.broadcasted || listed.contains(id.as_str());
            if !keep {
                tracing::debug!(transaction = %id, "no longer pending on the coordinator");
            }
            keep
        });

        for tx in pending {
            if confirmed.contains(&tx.id) {
                continue;
            }
            match entries.get_mut(&tx.id) {
                Some(entry) => {
                    entry.tx = tx;
                    entry.from_coordinator = true;
                }
                None => {
                    entries.insert(
                        tx.id.clone(),
                        TrackedTransaction {
                            tx,
                            signed_locally: false,
                            broadcasted: false,
                            from_coordinator: true,
                        },
                    );
                }
            }
        }

        Ok(TransactionSyncReport {
            confirmed,
            pending: entries.len(),
        })
    }
}
