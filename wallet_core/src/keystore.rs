//! Password encryption for wallet secrets.
//!
//! A secret (mnemonic, WIF, raw private key) is sealed as follows:
//! 1. Argon2id derives a 32-byte key from the password and a random salt
//! 2. AES-256-GCM encrypts the secret under a random nonce
//! 3. Salt, nonce, ciphertext and KDF parameters are kept together so the
//!    password alone is enough to open it again
//!
//! The GCM tag doubles as the password check: a wrong password fails
//! authentication and is reported as [`WalletError::EncryptionVerificationFailed`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::WalletError;

const KEYSTORE_VERSION: u32 = 1;
const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreFile {
    pub version: u32,
    pub kdf_params: KdfParams,
    /// Hex-encoded.
    pub salt: String,
    /// Hex-encoded.
    pub nonce: String,
    /// Hex-encoded.
    pub ciphertext: String,
}

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 1 lane.
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KeystoreFile {
    /// Seal `secret` under `password` with the default KDF cost.
    pub fn seal(secret: &[u8], password: &str) -> Result<Self, WalletError> {
        Self::seal_with(secret, password, KdfParams::default())
    }

    pub fn seal_with(secret: &[u8], password: &str, params: KdfParams) -> Result<Self, WalletError> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce_bytes);

        let key = derive_key(password, &salt, params)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| WalletError::Key(format!("AES key init failed: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), secret)
            .map_err(|e| WalletError::Key(format!("encryption failed: {e}")))?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            kdf_params: params,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        })
    }

    /// Recover the secret. A wrong password is
    /// [`WalletError::EncryptionVerificationFailed`]; malformed files are
    /// [`WalletError::Key`].
    pub fn open(&self, password: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        if self.version != KEYSTORE_VERSION {
            return Err(WalletError::Key(format!(
                "unsupported keystore version: {}",
                self.version
            )));
        }
        let salt = decode_field("salt", &self.salt)?;
        let nonce_bytes = decode_field("nonce", &self.nonce)?;
        let ciphertext = decode_field("ciphertext", &self.ciphertext)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(WalletError::Key(format!(
                "invalid nonce length: expected {NONCE_LEN}, got {}",
                nonce_bytes.len()
            )));
        }

        let key = derive_key(password, &salt, self.kdf_params)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| WalletError::Key(format!("AES key init failed: {e}")))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map(Zeroizing::new)
            .map_err(|_| WalletError::EncryptionVerificationFailed)
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, WalletError> {
    hex::decode(value).map_err(|e| WalletError::Key(format!("invalid {name} hex: {e}")))
}

fn derive_key(
    password: &str,
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, WalletError> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| WalletError::Key(format!("Argon2 params error: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output[..])
        .map_err(|e| WalletError::Key(format!("Argon2 hashing failed: {e}")))?;
    Ok(output)
}
