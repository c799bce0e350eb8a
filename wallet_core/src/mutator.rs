//! Direct setters for a wallet's locally owned fields.

use coffer_ledger_client::LedgerClient;
use coffer_types::PublicKey;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::data::{Restoration, WalletStatus};
use crate::error::WalletError;
use crate::keystore::KeystoreFile;
use crate::wallet::Wallet;

pub struct WalletMutator<'a> {
    wallet: &'a Wallet,
}

impl<'a> WalletMutator<'a> {
    pub(crate) fn new(wallet: &'a Wallet) -> Self {
        Self { wallet }
    }

    /// Attach a ledger client. A wallet that has not been restored yet
    /// becomes partially restored.
    pub fn ledger_client(&self, client: Arc<dyn LedgerClient>) {
        let mut state = self.wallet.write();
        state.client = Some(client);
        if state.restoration == Restoration::Pending {
            state.restoration = Restoration::Partial;
        }
    }

    pub fn set_status(&self, status: WalletStatus) {
        self.wallet.write().data.status = status;
    }

    pub fn set_public_key(&self, public_key: PublicKey) {
        self.wallet.write().data.public_key = Some(public_key);
    }

    pub fn toggle_starred(&self) -> bool {
        let mut state = self.wallet.write();
        state.data.is_starred = !state.data.is_starred;
        state.data.is_starred
    }

    pub fn set_primary(&self, primary: bool) {
        self.wallet.write().data.is_primary = primary;
    }

    pub fn set_alias(&self, alias: impl Into<String>) {
        self.wallet.write().data.alias = Some(alias.into());
    }

    pub fn set_ledger_model(&self, model: impl Into<String>) {
        self.wallet.write().data.ledger_model = Some(model.into());
    }

    pub fn set_exchange_currency(&self, currency: impl Into<String>) {
        self.wallet.write().data.exchange_currency = currency.into().to_ascii_uppercase();
    }

    /// Seal the wallet's secret under `password` and switch the import method
    /// to its encrypted variant.
    pub fn encrypt(&self, secret: &[u8], password: &str) -> Result<(), WalletError> {
        let method = self.wallet.import_method();
        let encrypted = method
            .encrypted()
            .ok_or_else(|| WalletError::UnsupportedEncryption(method.to_string()))?;
        let keystore = KeystoreFile::seal(secret, password)?;

        let mut state = self.wallet.write();
        state.keystore = Some(keystore);
        state.data.import_method = encrypted;
        Ok(())
    }

    /// Verify `password` against the stored keystore, then drop the
    /// encryption. Returns the recovered secret. A wrong password changes
    /// nothing.
    pub fn remove_encryption(&self, password: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let keystore = self
            .wallet
            .read()
            .keystore
            .clone()
            .ok_or(WalletError::NotEncrypted)?;
        let secret = keystore.open(password)?;

        let mut state = self.wallet.write();
        state.keystore = None;
        state.data.import_method = state.data.import_method.decrypted();
        tracing::info!(address = %state.data.address, "encryption removed");
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Derivation, ImportMethod};
    use crate::wallet::WalletServices;
    use coffer_nullables::NullLedgerClient;
    use coffer_types::NetworkProfile;

    fn mnemonic_wallet() -> Wallet {
        Wallet::new(
            "D61mfSggzbvQgTUe6JhYKH2doHaqJ3Dyib".into(),
            NetworkProfile::default(),
            ImportMethod::Mnemonic {
                derivation: Derivation::Bip39,
                encrypted: false,
            },
            WalletServices::default(),
        )
    }

    #[test]
    fn attaching_a_client_marks_partial() {
        let wallet = mnemonic_wallet();
        wallet.mutator().ledger_client(Arc::new(NullLedgerClient::new()));
        assert!(wallet.restoration().partial());
        assert!(wallet.ledger_client().is_ok());
    }

    #[test]
    fn settings() {
        let wallet = mnemonic_wallet();
        let m = wallet.mutator();
        assert!(m.toggle_starred());
        assert!(!m.toggle_starred());
        m.set_primary(true);
        m.set_alias("savings");
        m.set_ledger_model("nanoX");
        m.set_exchange_currency("eur");
        m.set_status(WalletStatus::Hot);

        assert!(wallet.is_primary());
        assert_eq!(wallet.alias().as_deref(), Some("savings"));
        assert!(wallet.is_ledger());
        assert_eq!(wallet.exchange_currency(), "EUR");
        assert_eq!(wallet.status(), WalletStatus::Hot);
    }

    #[test]
    fn encryption_roundtrip() {
        let wallet = mnemonic_wallet();
        wallet.mutator().encrypt(b"word word word", "pw").unwrap();
        assert!(wallet.import_method().is_encrypted());
        assert_eq!(wallet.import_method().to_string(), "bip39_with_encryption");

        assert!(matches!(
            wallet.mutator().remove_encryption("nope"),
            Err(WalletError::EncryptionVerificationFailed)
        ));
        assert!(wallet.import_method().is_encrypted());
        assert!(wallet.has_keystore());

        let secret = wallet.mutator().remove_encryption("pw").unwrap();
        assert_eq!(secret.as_slice(), b"word word word");
        assert!(!wallet.import_method().is_encrypted());
        assert!(!wallet.has_keystore());
    }

    #[test]
    fn watch_only_wallets_cannot_be_encrypted() {
        let wallet = Wallet::new(
            "D61mfSggzbvQgTUe6JhYKH2doHaqJ3Dyib".into(),
            NetworkProfile::default(),
            ImportMethod::Address,
            WalletServices::default(),
        );
        assert!(matches!(
            wallet.mutator().encrypt(b"x", "pw"),
            Err(WalletError::UnsupportedEncryption(_))
        ));
        assert!(matches!(
            wallet.mutator().remove_encryption("pw"),
            Err(WalletError::NotEncrypted)
        ));
    }
}
