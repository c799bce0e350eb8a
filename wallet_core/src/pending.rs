//! Pending transaction tracking.
//!
//! [`WalletTransactions`] polls the wallet's transaction service on an
//! interval and publishes the classified pending set on a watch channel.
//! Each poll replaces the published set wholesale: a transaction that the
//! service no longer knows simply disappears from it.

use coffer_ledger_client::SignedTransaction;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::WalletError;
use crate::multi_signature::MultiSignatureStatus;
use crate::transaction_service::TransactionService;
use crate::wallet::Wallet;

pub const DEFAULT_PENDING_SYNC_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PendingState {
    /// Signed locally, not broadcast yet.
    PendingTransfer,
    AwaitingOurSignature,
    AwaitingOtherSignatures,
    AwaitingConfirmation,
    AwaitingFinalSignature,
    ReadyToBroadcast,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub transaction: SignedTransaction,
    pub state: PendingState,
    pub is_pending_transfer: bool,
    pub has_been_signed: bool,
    pub is_awaiting_confirmation: bool,
    pub is_awaiting_our_signature: bool,
    pub is_awaiting_other_signatures: bool,
}

impl PendingTransaction {
    pub fn id(&self) -> &str {
        &self.transaction.id
    }
}

fn classify(service: &TransactionService<'_>, transaction: SignedTransaction) -> PendingTransaction {
    let id = transaction.id.as_str();
    let has_been_signed = service.has_been_signed(id);
    let is_awaiting_confirmation = service.is_awaiting_confirmation(id);
    let is_pending_transfer =
        !transaction.uses_multi_signature() && (has_been_signed || is_awaiting_confirmation);

    let state = match service.status(id) {
        Some(MultiSignatureStatus::AwaitingOurSignature) => PendingState::AwaitingOurSignature,
        Some(MultiSignatureStatus::AwaitingOtherSignatures) => PendingState::AwaitingOtherSignatures,
        Some(MultiSignatureStatus::AwaitingConfirmation) => PendingState::AwaitingConfirmation,
        Some(MultiSignatureStatus::AwaitingFinalSignature) => PendingState::AwaitingFinalSignature,
        Some(MultiSignatureStatus::Ready) => PendingState::ReadyToBroadcast,
        None if is_awaiting_confirmation => PendingState::AwaitingConfirmation,
        None => PendingState::PendingTransfer,
    };

    PendingTransaction {
        is_awaiting_our_signature: state == PendingState::AwaitingOurSignature,
        is_awaiting_other_signatures: state == PendingState::AwaitingOtherSignatures,
        transaction,
        state,
        is_pending_transfer,
        has_been_signed,
        is_awaiting_confirmation,
    }
}

/// The pending transaction set of one wallet.
#[derive(Clone)]
pub struct WalletTransactions {
    wallet: Wallet,
    interval: Duration,
    pending: Arc<watch::Sender<Vec<PendingTransaction>>>,
}

impl WalletTransactions {
    pub fn new(wallet: Wallet) -> Self {
        Self::with_interval(wallet, DEFAULT_PENDING_SYNC_INTERVAL)
    }

    pub fn with_interval(wallet: Wallet, interval: Duration) -> Self {
        let (pending, _) = watch::channel(Vec::new());
        Self {
            wallet,
            interval,
            pending: Arc::new(pending),
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// The set published by the last poll.
    pub fn pending_transactions(&self) -> Vec<PendingTransaction> {
        self.pending.borrow().clone()
    }

    /// Receive every newly published pending set.
    pub fn subscribe(&self) -> watch::Receiver<Vec<PendingTransaction>> {
        self.pending.subscribe()
    }

    /// Run one poll: reconcile the wallet's transaction service with the
    /// ledger, then rebuild and publish the pending set.
    ///
    /// On error the previously published set stays in place.
    pub async fn sync_pending(&self) -> Result<Vec<PendingTransaction>, WalletError> {
        let service = self.wallet.transaction();
        service.sync().await?;

        let previous: Vec<String> = self
            .pending
            .borrow()
            .iter()
            .map(|p| p.transaction.id.clone())
            .collect();
        let candidates = previous
            .into_iter()
            .chain(service.signed().into_iter().map(|tx| tx.id))
            .chain(service.broadcasted().into_iter().map(|tx| tx.id))
            .chain(service.multi_signatures().into_iter().map(|tx| tx.id));

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for id in candidates {
            if !seen.insert(id.clone()) {
                continue;
            }
            match service.transaction(&id) {
                Some(tx) => pending.push(classify(&service, tx)),
                None => tracing::debug!(transaction = %id, "no longer pending"),
            }
        }

        self.pending.send_replace(pending.clone());
        Ok(pending)
    }

    /// Poll every interval in a background task, starting immediately.
    pub fn start_syncing_pending_transactions(&self) -> PendingSyncHandle {
        let (stop, mut stop_rx) = broadcast::channel(1);
        let tracker = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tracker.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => {
                        tracing::debug!(address = %tracker.wallet.address(), "pending transaction sync stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = tracker.sync_pending().await {
                            tracing::warn!(error = %e, "pending transaction sync failed, retrying next tick");
                        }
                    }
                }
            }
        });

        PendingSyncHandle {
            stop,
            task: Some(task),
        }
    }

    pub fn stop_syncing_pending_transactions(&self, handle: &PendingSyncHandle) {
        handle.stop();
    }
}

/// Controls a running pending-transaction poll. Dropping it stops the poll.
///
/// Stopping never interrupts a poll already in flight; the task exits before
/// the next one.
pub struct PendingSyncHandle {
    stop: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PendingSyncHandle {
    pub fn stop(&self) {
        let _ = self.stop.send(());
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop and wait for the task to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "pending transaction sync task failed");
            }
        }
    }
}

impl Drop for PendingSyncHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use coffer_ledger_client::{LedgerError, ParticipantSignature};
    use coffer_nullables::NullLedgerClient;

    async fn synced() -> (Arc<NullLedgerClient>, Wallet) {
        let ledger = Arc::new(NullLedgerClient::new());
        ledger.set_wallet(ADDRESS, record());
        let wallet = wallet_with(ledger.clone());
        wallet.synchroniser().identity().await.unwrap();
        (ledger, wallet)
    }

    fn multisig(id: &str, signed_by: &[u32]) -> SignedTransaction {
        let mut tx = signed(id);
        tx.multi_signature = Some(simple(2, &[PUBLIC_KEY, "pk-b"]));
        tx.signatures = signed_by
            .iter()
            .map(|&index| ParticipantSignature {
                index,
                signature: "00".into(),
            })
            .collect();
        tx
    }

    #[tokio::test]
    async fn signed_and_broadcast_transfer_appears_once() {
        let (_, wallet) = synced().await;
        wallet.transaction().add_signed(signed("t1"));
        wallet.transaction().mark_broadcasted("t1").unwrap();
        let tracker = WalletTransactions::new(wallet);

        let pending = tracker.sync_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        let p = &pending[0];
        assert!(p.is_pending_transfer);
        assert!(p.has_been_signed);
        assert!(p.is_awaiting_confirmation);
        assert_eq!(p.state, PendingState::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn confirmed_transactions_leave_the_set() {
        let (ledger, wallet) = synced().await;
        wallet.transaction().add_signed(signed("t1"));
        wallet.transaction().mark_broadcasted("t1").unwrap();
        let tracker = WalletTransactions::new(wallet);
        assert_eq!(tracker.sync_pending().await.unwrap().len(), 1);

        ledger.confirm(raw("t1", ADDRESS, OTHER, "1", "0"));
        assert!(tracker.sync_pending().await.unwrap().is_empty());
        assert!(tracker.pending_transactions().is_empty());
    }

    #[tokio::test]
    async fn forgotten_transactions_are_dropped() {
        let (_, wallet) = synced().await;
        wallet.transaction().add_signed(signed("t1"));
        let tracker = WalletTransactions::new(wallet.clone());
        assert_eq!(tracker.sync_pending().await.unwrap()[0].state, PendingState::PendingTransfer);

        wallet.transaction().forget("t1");
        assert!(tracker.sync_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn multi_signature_transactions_are_classified() {
        let (ledger, wallet) = synced().await;
        ledger.set_pending_multi_signatures(
            PUBLIC_KEY.into(),
            vec![multisig("ours", &[1]), multisig("theirs", &[0])],
        );
        let tracker = WalletTransactions::new(wallet);

        let pending = tracker.sync_pending().await.unwrap();
        let ours = pending.iter().find(|p| p.id() == "ours").unwrap();
        assert!(ours.is_awaiting_our_signature);
        assert!(!ours.is_pending_transfer);
        let theirs = pending.iter().find(|p| p.id() == "theirs").unwrap();
        assert!(theirs.is_awaiting_other_signatures);
        assert!(theirs.has_been_signed);
    }

    #[tokio::test]
    async fn failed_poll_keeps_previous_set() {
        let (ledger, wallet) = synced().await;
        wallet.transaction().add_signed(signed("t1"));
        let tracker = WalletTransactions::new(wallet);
        tracker.sync_pending().await.unwrap();

        ledger.fail_pending_multi_signatures(Some(LedgerError::Unreachable("down".into())));
        assert!(tracker.sync_pending().await.is_err());
        assert_eq!(tracker.pending_transactions().len(), 1);
    }

    #[tokio::test]
    async fn background_poll_publishes_until_stopped() {
        let (ledger, wallet) = synced().await;
        wallet.transaction().add_signed(signed("t1"));
        let tracker = WalletTransactions::with_interval(wallet, Duration::from_millis(10));
        let mut updates = tracker.subscribe();

        let handle = tracker.start_syncing_pending_transactions();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().len(), 1);
        assert!(handle.is_running());

        tracker.stop_syncing_pending_transactions(&handle);
        handle.join().await;
        let polls = ledger.call_count("pending:");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ledger.call_count("pending:"), polls);
    }

    #[test]
    fn default_interval_is_five_seconds() {
        assert_eq!(DEFAULT_PENDING_SYNC_INTERVAL, Duration::from_secs(5));
    }
}
