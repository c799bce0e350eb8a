//! The wallet record store.
//!
//! A [`Wallet`] is a cheap, cloneable handle over one wallet's state. Each
//! wallet owns its own store; nothing is shared between wallets, so several
//! can be synchronised at once without coordination. Locks are only ever held
//! between suspension points, never across one.

use coffer_ledger_client::{
    ExchangeRateConverter, KnownWalletService, KnownWallets, LedgerClient, RateTable,
    WalletIdentifier, WalletRecord,
};
use coffer_types::{Address, DecimalValue, MultiSignatureDescriptor, NetworkProfile, PublicKey};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use uuid::Uuid;

use crate::data::{
    ImportMethod, Restoration, VotingState, WalletBalance, WalletStatus, WalletToken,
};
use crate::error::WalletError;
use crate::keystore::KeystoreFile;
use crate::multi_signature::WalletMultiSignature;
use crate::mutator::WalletMutator;
use crate::synchroniser::WalletSynchroniser;
use crate::transaction_index::TransactionIndex;
use crate::transaction_service::{TransactionService, TransactionState};

/// Default currency wallets report fiat values in.
pub const DEFAULT_EXCHANGE_CURRENCY: &str = "USD";

/// Opaque wallet handle identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletId(Uuid);

impl WalletId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capabilities a wallet needs besides its ledger client, injected at
/// construction.
#[derive(Clone)]
pub struct WalletServices {
    pub exchange_rates: Arc<dyn ExchangeRateConverter>,
    pub known_wallets: Arc<dyn KnownWalletService>,
}

impl WalletServices {
    pub fn new(
        exchange_rates: Arc<dyn ExchangeRateConverter>,
        known_wallets: Arc<dyn KnownWalletService>,
    ) -> Self {
        Self {
            exchange_rates,
            known_wallets,
        }
    }
}

impl Default for WalletServices {
    fn default() -> Self {
        Self::new(Arc::new(RateTable::new()), Arc::new(KnownWallets::default()))
    }
}

/// Persisted fields.
pub(crate) struct WalletData {
    pub(crate) address: Address,
    pub(crate) public_key: Option<PublicKey>,
    pub(crate) import_method: ImportMethod,
    pub(crate) balance: WalletBalance,
    pub(crate) nonce: DecimalValue,
    pub(crate) status: WalletStatus,
    pub(crate) alias: Option<String>,
    pub(crate) is_primary: bool,
    pub(crate) is_starred: bool,
    pub(crate) ledger_model: Option<String>,
    pub(crate) exchange_currency: String,
}

/// What the ledger last told us about this wallet and its co-signers.
#[derive(Clone, Default)]
pub(crate) struct IdentityCache {
    pub(crate) record: Option<WalletRecord>,
    pub(crate) participants: BTreeMap<PublicKey, WalletRecord>,
}

pub(crate) struct WalletState {
    pub(crate) data: WalletData,
    pub(crate) identity: IdentityCache,
    pub(crate) restoration: Restoration,
    pub(crate) client: Option<Arc<dyn LedgerClient>>,
    pub(crate) votes: VotingState,
    pub(crate) tokens: Vec<WalletToken>,
    pub(crate) keystore: Option<KeystoreFile>,
    pub(crate) transactions: TransactionState,
}

pub(crate) struct WalletInner {
    id: WalletId,
    network: NetworkProfile,
    services: WalletServices,
    state: RwLock<WalletState>,
}

/// A wallet bound to one network.
#[derive(Clone)]
pub struct Wallet {
    inner: Arc<WalletInner>,
}

impl Wallet {
    pub fn new(
        address: Address,
        network: NetworkProfile,
        import_method: ImportMethod,
        services: WalletServices,
    ) -> Self {
        let state = WalletState {
            data: WalletData {
                address,
                public_key: None,
                import_method,
                balance: WalletBalance::default(),
                nonce: DecimalValue::ZERO,
                status: WalletStatus::default(),
                alias: None,
                is_primary: false,
                is_starred: false,
                ledger_model: None,
                exchange_currency: DEFAULT_EXCHANGE_CURRENCY.to_string(),
            },
            identity: IdentityCache::default(),
            restoration: Restoration::default(),
            client: None,
            votes: VotingState::default(),
            tokens: Vec::new(),
            keystore: None,
            transactions: TransactionState::default(),
        };
        Self {
            inner: Arc::new(WalletInner {
                id: WalletId::new(),
                network,
                services,
                state: RwLock::new(state),
            }),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, WalletState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, WalletState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<WalletInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &Weak<WalletInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // ── Services ────────────────────────────────────────────────────────

    pub fn synchroniser(&self) -> WalletSynchroniser<'_> {
        WalletSynchroniser::new(self)
    }

    pub fn multi_signature(&self) -> WalletMultiSignature<'_> {
        WalletMultiSignature::new(self)
    }

    pub fn transaction_index(&self) -> TransactionIndex<'_> {
        TransactionIndex::new(self)
    }

    /// Wallet-internal state of signed, broadcast and co-signed transactions.
    pub fn transaction(&self) -> TransactionService<'_> {
        TransactionService::new(self)
    }

    pub fn mutator(&self) -> WalletMutator<'_> {
        WalletMutator::new(self)
    }

    pub fn services(&self) -> &WalletServices {
        &self.inner.services
    }

    pub fn ledger_client(&self) -> Result<Arc<dyn LedgerClient>, WalletError> {
        self.read().client.clone().ok_or(WalletError::NoLedgerClient)
    }

    // ── Local fields ────────────────────────────────────────────────────

    pub fn id(&self) -> WalletId {
        self.inner.id
    }

    pub fn network(&self) -> &NetworkProfile {
        &self.inner.network
    }

    /// The wallet currency: the network's native ticker.
    pub fn currency(&self) -> &str {
        &self.inner.network.ticker
    }

    pub fn exchange_currency(&self) -> String {
        self.read().data.exchange_currency.clone()
    }

    pub fn address(&self) -> Address {
        self.read().data.address.clone()
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.read().data.public_key.clone()
    }

    pub fn import_method(&self) -> ImportMethod {
        self.read().data.import_method
    }

    pub fn balance(&self) -> WalletBalance {
        self.read().data.balance.clone()
    }

    pub fn nonce(&self) -> DecimalValue {
        self.read().data.nonce.clone()
    }

    pub fn status(&self) -> WalletStatus {
        self.read().data.status
    }

    pub fn alias(&self) -> Option<String> {
        self.read().data.alias.clone()
    }

    pub fn is_primary(&self) -> bool {
        self.read().data.is_primary
    }

    pub fn is_starred(&self) -> bool {
        self.read().data.is_starred
    }

    pub fn ledger_model(&self) -> Option<String> {
        self.read().data.ledger_model.clone()
    }

    pub fn is_ledger(&self) -> bool {
        self.read().data.ledger_model.is_some()
    }

    pub fn restoration(&self) -> Restoration {
        self.read().restoration
    }

    pub fn votes(&self) -> VotingState {
        self.read().votes.clone()
    }

    pub fn tokens(&self) -> Vec<WalletToken> {
        self.read().tokens.clone()
    }

    pub fn has_keystore(&self) -> bool {
        self.read().keystore.is_some()
    }

    pub fn known_name(&self) -> Option<String> {
        let address = self.address();
        self.inner
            .services
            .known_wallets
            .name(&self.inner.network.id, &address)
    }

    pub fn is_known(&self) -> bool {
        self.known_name().is_some()
    }

    /// Flip Cold to Hot. Returns whether the status changed.
    pub(crate) fn mark_hot_if_cold(&self) -> bool {
        let mut state = self.write();
        if state.data.status == WalletStatus::Cold {
            state.data.status = WalletStatus::Hot;
            true
        } else {
            false
        }
    }

    /// How the ledger should be asked about this wallet.
    pub(crate) fn ledger_identifier(&self) -> WalletIdentifier {
        let state = self.read();
        match (&state.data.public_key, self.inner.network.uses_extended_public_key) {
            (Some(key), true) => {
                let method = state
                    .data
                    .import_method
                    .derivation()
                    .map(|d| d.as_str())
                    .unwrap_or("bip44");
                WalletIdentifier::extended_public_key(key, method)
            }
            _ => WalletIdentifier::address(&state.data.address),
        }
    }

    // ── Ledger-observed identity ────────────────────────────────────────

    /// True when the last fetched ledger record reports success.
    pub fn has_synced_with_network(&self) -> bool {
        self.read()
            .identity
            .record
            .as_ref()
            .is_some_and(WalletRecord::has_passed)
    }

    /// The identity slice of the wallet, available once a ledger record has
    /// been cached by [`WalletSynchroniser::identity`].
    pub fn identity(&self) -> Result<WalletIdentity, WalletError> {
        let state = self.read();
        let record = state
            .identity
            .record
            .clone()
            .ok_or(WalletError::NotSynchronized)?;
        Ok(WalletIdentity {
            record,
            address: state.data.address.clone(),
            public_key: state.data.public_key.clone(),
        })
    }

    pub fn username(&self) -> Result<Option<String>, WalletError> {
        self.identity().map(|i| i.username().map(str::to_string))
    }

    pub fn is_validator(&self) -> Result<bool, WalletError> {
        self.identity().map(|i| i.is_validator())
    }

    pub fn is_resigned_validator(&self) -> Result<bool, WalletError> {
        self.identity().map(|i| i.is_resigned_validator())
    }

    pub fn is_multi_signature(&self) -> Result<bool, WalletError> {
        self.identity().map(|i| i.is_multi_signature())
    }

    pub fn is_second_signature(&self) -> Result<bool, WalletError> {
        self.identity().map(|i| i.is_second_signature())
    }

    pub fn second_public_key(&self) -> Result<Option<PublicKey>, WalletError> {
        self.identity().map(|i| i.second_public_key().cloned())
    }

    pub fn primary_key(&self) -> Result<String, WalletError> {
        self.identity().map(|i| i.primary_key().to_string())
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Wallet")
            .field("id", &self.inner.id)
            .field("network", &self.inner.network.id)
            .field("address", &state.data.address)
            .field("status", &state.data.status)
            .field("restoration", &state.restoration)
            .finish()
    }
}

/// Snapshot of the identity fields of a synchronised wallet.
///
/// Only [`Wallet::identity`] hands these out, so holding one proves a ledger
/// record was cached.
#[derive(Clone, Debug)]
pub struct WalletIdentity {
    record: WalletRecord,
    address: Address,
    public_key: Option<PublicKey>,
}

impl WalletIdentity {
    pub fn record(&self) -> &WalletRecord {
        &self.record
    }

    pub fn username(&self) -> Option<&str> {
        self.record.username.as_deref()
    }

    pub fn is_validator(&self) -> bool {
        self.record.is_validator
    }

    pub fn is_resigned_validator(&self) -> bool {
        self.record.is_resigned_validator
    }

    pub fn is_multi_signature(&self) -> bool {
        self.record.is_multi_signature()
    }

    pub fn is_second_signature(&self) -> bool {
        self.record.is_second_signature()
    }

    pub fn second_public_key(&self) -> Option<&PublicKey> {
        self.record.second_public_key.as_ref()
    }

    pub fn multi_signature(&self) -> Option<&MultiSignatureDescriptor> {
        self.record.multi_signature.as_ref()
    }

    /// The key the wallet is primarily identified by: its public key when
    /// known, its address otherwise.
    pub fn primary_key(&self) -> &str {
        match &self.public_key {
            Some(key) => key.as_str(),
            None => self.address.as_str(),
        }
    }
}
