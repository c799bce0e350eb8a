//! Multi-signature resolution: the wallet's registered signer set and the
//! quorum state of individual transactions.

use coffer_ledger_client::{KnownWalletService, SignedTransaction};
use coffer_types::{Address, MultiSignatureDescriptor, PublicKey};
use std::collections::BTreeSet;

use crate::error::WalletError;
use crate::wallet::Wallet;

/// A participant identity for display. Never used to sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOnlyWallet {
    pub public_key: PublicKey,
    pub address: Option<Address>,
    pub username: Option<String>,
    pub is_validator: bool,
    pub known_name: Option<String>,
}

impl ReadOnlyWallet {
    /// Known name, then username, then address, then public key.
    pub fn display_name(&self) -> String {
        self.known_name
            .clone()
            .or_else(|| self.username.clone())
            .or_else(|| self.address.as_ref().map(Address::to_string))
            .unwrap_or_else(|| self.public_key.to_string())
    }
}

pub struct WalletMultiSignature<'a> {
    wallet: &'a Wallet,
}

impl<'a> WalletMultiSignature<'a> {
    pub(crate) fn new(wallet: &'a Wallet) -> Self {
        Self { wallet }
    }

    /// The registered descriptor.
    pub fn all(&self) -> Result<MultiSignatureDescriptor, WalletError> {
        self.wallet
            .identity()?
            .multi_signature()
            .cloned()
            .ok_or(WalletError::NotRegistered)
    }

    /// Flattened signer keys, mandatory keys first for advanced descriptors.
    pub fn public_keys(&self) -> Result<Vec<PublicKey>, WalletError> {
        self.all().map(|descriptor| descriptor.public_keys())
    }

    /// Participants of the current descriptor, decorated from the records
    /// cached by [`crate::WalletSynchroniser::multi_signature`].
    pub fn participants(&self) -> Result<Vec<ReadOnlyWallet>, WalletError> {
        let keys = self.public_keys()?;
        let network = &self.wallet.network().id;
        let known = &self.wallet.services().known_wallets;

        let participants = {
            let state = self.wallet.read();
            keys.into_iter()
                .map(|public_key| match state.identity.participants.get(&public_key) {
                    Some(record) => ReadOnlyWallet {
                        public_key,
                        address: Some(record.address.clone()),
                        username: record.username.clone(),
                        is_validator: record.is_validator,
                        known_name: None,
                    },
                    None => ReadOnlyWallet {
                        public_key,
                        address: None,
                        username: None,
                        is_validator: false,
                        known_name: None,
                    },
                })
                .collect::<Vec<_>>()
        };

        Ok(participants
            .into_iter()
            .map(|mut participant| {
                participant.known_name = participant
                    .address
                    .as_ref()
                    .and_then(|address| known.name(network, address));
                participant
            })
            .collect())
    }
}

// ── Quorum rules ────────────────────────────────────────────────────────

/// Where a multi-signature transaction stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MultiSignatureStatus {
    AwaitingOurSignature,
    AwaitingOtherSignatures,
    AwaitingConfirmation,
    AwaitingFinalSignature,
    Ready,
}

fn readiness_error(tx: &SignedTransaction, reason: impl std::fmt::Display) -> WalletError {
    WalletError::MultiSignatureReadinessCheckFailed(format!("{}: {reason}", tx.id))
}

fn descriptor(tx: &SignedTransaction) -> Result<&MultiSignatureDescriptor, WalletError> {
    tx.multi_signature
        .as_ref()
        .ok_or_else(|| readiness_error(tx, "no multi-signature descriptor"))
}

/// Keys that have signed, resolved through each signature's participant index.
pub fn signers(tx: &SignedTransaction) -> Result<BTreeSet<PublicKey>, WalletError> {
    let keys = descriptor(tx)?.public_keys();
    tx.signatures
        .iter()
        .map(|signature| {
            keys.get(signature.index as usize).cloned().ok_or_else(|| {
                readiness_error(
                    tx,
                    format_args!(
                        "signature index {} out of range for {} participants",
                        signature.index,
                        keys.len()
                    ),
                )
            })
        })
        .collect()
}

pub fn has_signed(tx: &SignedTransaction, key: &PublicKey) -> bool {
    signers(tx).is_ok_and(|signers| signers.contains(key))
}

/// Signatures still missing before quorum. Unsigned mandatory keys count even
/// when the threshold itself is already reached.
pub fn remaining_signature_count(tx: &SignedTransaction) -> usize {
    let Some(descriptor) = tx.multi_signature.as_ref() else {
        return 0;
    };
    let signers = signers(tx).unwrap_or_default();
    let below_threshold = (descriptor.threshold() as usize).saturating_sub(signers.len());
    let mandatory_missing = descriptor
        .mandatory_keys()
        .iter()
        .filter(|key| !signers.contains(*key))
        .count();
    below_threshold.max(mandatory_missing)
}

pub fn threshold_met(tx: &SignedTransaction) -> bool {
    tx.uses_multi_signature() && remaining_signature_count(tx) == 0
}

/// Every participant must sign.
pub fn needs_all_signatures(tx: &SignedTransaction) -> bool {
    tx.multi_signature
        .as_ref()
        .is_some_and(|d| d.threshold() as usize == d.participant_count())
}

/// `key` belongs to the signer set, has not signed, and quorum is not reached.
pub fn needs_wallet_signature(tx: &SignedTransaction, key: &PublicKey) -> bool {
    tx.multi_signature
        .as_ref()
        .is_some_and(|d| d.is_participant(key))
        && !has_signed(tx, key)
        && !threshold_met(tx)
}

pub fn needs_final_signature(tx: &SignedTransaction) -> bool {
    threshold_met(tx) && tx.final_signature.is_none()
}

/// Quorum reached and closed by the final signature.
///
/// Fails on a payload that cannot be judged: no descriptor, a zero or
/// unreachable threshold, or a signature pointing outside the signer set.
pub fn is_multi_signature_ready(tx: &SignedTransaction) -> Result<bool, WalletError> {
    let descriptor = descriptor(tx)?;
    let threshold = descriptor.threshold() as usize;
    if threshold == 0 {
        return Err(readiness_error(tx, "threshold is zero"));
    }
    if threshold > descriptor.participant_count() {
        return Err(readiness_error(
            tx,
            format_args!(
                "threshold {threshold} exceeds {} participants",
                descriptor.participant_count()
            ),
        ));
    }
    signers(tx)?;
    Ok(threshold_met(tx) && tx.final_signature.is_some())
}

/// Classify a multi-signature transaction for the wallet holding `our_key`.
///
/// A transaction whose readiness cannot be judged is reported as awaiting the
/// final signature, never as ready. That includes a payload whose signatures
/// cannot be resolved, which is caught before any signer-based rule runs.
pub fn status(
    tx: &SignedTransaction,
    our_key: Option<&PublicKey>,
    broadcasted: bool,
) -> MultiSignatureStatus {
    if let Err(e) = signers(tx) {
        return unjudgeable(tx, &e);
    }
    if let Some(key) = our_key {
        if needs_wallet_signature(tx, key) {
            return MultiSignatureStatus::AwaitingOurSignature;
        }
        if has_signed(tx, key) && !threshold_met(tx) {
            return MultiSignatureStatus::AwaitingOtherSignatures;
        }
    }
    if threshold_met(tx) && broadcasted {
        return MultiSignatureStatus::AwaitingConfirmation;
    }
    match is_multi_signature_ready(tx) {
        Ok(true) => MultiSignatureStatus::Ready,
        Ok(false) => MultiSignatureStatus::AwaitingFinalSignature,
        Err(e) => unjudgeable(tx, &e),
    }
}

fn unjudgeable(tx: &SignedTransaction, error: &WalletError) -> MultiSignatureStatus {
    tracing::warn!(transaction = %tx.id, %error, "treating transaction as awaiting final signature");
    MultiSignatureStatus::AwaitingFinalSignature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use coffer_ledger_client::ParticipantSignature;
    use coffer_nullables::NullLedgerClient;
    use std::sync::Arc;

    fn sig(index: u32) -> ParticipantSignature {
        ParticipantSignature {
            index,
            signature: format!("sig-{index}"),
        }
    }

    fn multisig_tx(descriptor: MultiSignatureDescriptor, indexes: &[u32]) -> SignedTransaction {
        let mut tx = signed("ms-1");
        tx.multi_signature = Some(descriptor);
        tx.signatures = indexes.iter().copied().map(sig).collect();
        tx
    }

    fn key(k: &str) -> PublicKey {
        k.into()
    }

    #[tokio::test]
    async fn resolver_gates_on_sync_and_registration() {
        let ledger = Arc::new(NullLedgerClient::new());
        let wallet = wallet_with(ledger.clone());
        assert!(matches!(wallet.multi_signature().all(), Err(WalletError::NotSynchronized)));
        assert!(matches!(
            wallet.multi_signature().participants(),
            Err(WalletError::NotSynchronized)
        ));

        ledger.set_wallet(ADDRESS, record());
        wallet.synchroniser().identity().await.unwrap();
        assert!(matches!(wallet.multi_signature().all(), Err(WalletError::NotRegistered)));
        assert!(matches!(
            wallet.multi_signature().public_keys(),
            Err(WalletError::NotRegistered)
        ));
    }

    #[tokio::test]
    async fn advanced_public_keys_list_mandatory_first() {
        let ledger = Arc::new(NullLedgerClient::new());
        ledger.set_wallet(
            ADDRESS,
            multisig_record(MultiSignatureDescriptor::Advanced {
                mandatory_keys: vec![key("m1"), key("m2")],
                optional_keys: vec![key("o1"), key("m1")],
                number_of_signatures: 3,
            }),
        );
        let wallet = wallet_with(ledger);
        wallet.synchroniser().identity().await.unwrap();

        assert_eq!(
            wallet.multi_signature().public_keys().unwrap(),
            vec![key("m1"), key("m2"), key("o1"), key("m1")]
        );
        // Without a participant sync every key is still listed, undecorated.
        let participants = wallet.multi_signature().participants().unwrap();
        assert_eq!(participants.len(), 4);
        assert!(participants.iter().all(|p| p.address.is_none()));
        assert_eq!(participants[2].display_name(), "o1");
    }

    #[test]
    fn two_of_three_walkthrough() {
        let d = simple(2, &["a", "b", "c"]);

        let tx = multisig_tx(d.clone(), &[]);
        assert_eq!(status(&tx, Some(&key("a")), false), MultiSignatureStatus::AwaitingOurSignature);
        assert_eq!(remaining_signature_count(&tx), 2);

        let tx = multisig_tx(d.clone(), &[0]);
        assert_eq!(status(&tx, Some(&key("a")), false), MultiSignatureStatus::AwaitingOtherSignatures);
        assert_eq!(status(&tx, Some(&key("b")), false), MultiSignatureStatus::AwaitingOurSignature);

        let mut tx = multisig_tx(d, &[0, 2]);
        assert!(threshold_met(&tx));
        assert!(!needs_wallet_signature(&tx, &key("b")));
        assert_eq!(status(&tx, Some(&key("a")), false), MultiSignatureStatus::AwaitingFinalSignature);
        assert!(needs_final_signature(&tx));

        tx.final_signature = Some("final".into());
        assert_eq!(status(&tx, Some(&key("a")), false), MultiSignatureStatus::Ready);
        assert_eq!(status(&tx, Some(&key("a")), true), MultiSignatureStatus::AwaitingConfirmation);
    }

    #[test]
    fn mandatory_keys_block_quorum() {
        let d = MultiSignatureDescriptor::Advanced {
            mandatory_keys: vec![key("m")],
            optional_keys: vec![key("x"), key("y")],
            number_of_signatures: 2,
        };
        let tx = multisig_tx(d, &[1, 2]);
        assert!(!threshold_met(&tx));
        assert_eq!(remaining_signature_count(&tx), 1);
        assert!(needs_wallet_signature(&tx, &key("m")));
        assert!(!needs_all_signatures(&tx));
    }

    #[test]
    fn needs_all_signatures_when_threshold_is_everyone() {
        let tx = multisig_tx(simple(3, &["a", "b", "c"]), &[]);
        assert!(needs_all_signatures(&tx));
    }

    #[test]
    fn malformed_payload_fails_safe() {
        let mut tx = multisig_tx(simple(2, &["a", "b"]), &[0, 7]);
        tx.final_signature = Some("final".into());
        assert!(matches!(
            is_multi_signature_ready(&tx),
            Err(WalletError::MultiSignatureReadinessCheckFailed(_))
        ));
        assert_eq!(status(&tx, None, false), MultiSignatureStatus::AwaitingFinalSignature);

        let tx = multisig_tx(simple(0, &["a"]), &[]);
        assert!(is_multi_signature_ready(&tx).is_err());

        let tx = multisig_tx(simple(3, &["a", "b"]), &[0, 1]);
        assert!(is_multi_signature_ready(&tx).is_err());

        assert!(is_multi_signature_ready(&signed("plain")).is_err());
    }

    #[test]
    fn unresolvable_signature_is_not_a_request_for_ours() {
        // "b" looks unsigned only because index 7 cannot be resolved.
        let tx = multisig_tx(simple(2, &["a", "b"]), &[0, 7]);
        assert!(!has_signed(&tx, &key("b")));
        assert_eq!(status(&tx, Some(&key("b")), false), MultiSignatureStatus::AwaitingFinalSignature);
        assert_eq!(status(&tx, Some(&key("a")), true), MultiSignatureStatus::AwaitingFinalSignature);
    }

    #[test]
    fn outsiders_are_never_asked_to_sign() {
        let tx = multisig_tx(simple(2, &["a", "b"]), &[]);
        assert!(!needs_wallet_signature(&tx, &key("z")));
        assert_eq!(status(&tx, Some(&key("z")), false), MultiSignatureStatus::AwaitingFinalSignature);
    }
}
