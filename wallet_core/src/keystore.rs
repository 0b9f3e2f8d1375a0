//! Argon2id + AES-256-GCM sealing for spending keys.
//!
//! Encrypting the wallet works in two layers:
//! 1. Argon2id derives a 32-byte master key from the passphrase and a random
//!    salt. The salt, KDF parameters, and an encrypted check value are stored
//!    as a [`MasterKeyRecord`] so a wrong passphrase is detected up front.
//! 2. Each spending key is sealed under the master key with AES-256-GCM and a
//!    fresh random nonce, yielding a [`SealedKey`].
//!
//! Every binary field is hex-encoded so records stay readable as JSON.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use nyx_types::SpendingKey;

use crate::WalletError;

/// Argon2id parameters: 64 MB memory, 3 iterations, 1 lane of parallelism.
const ARGON2_MEMORY_KIB: u32 = 65536; // 64 MB
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

const SALT_LEN: usize = 32;
/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

const RECORD_VERSION: u32 = 1;
const CHECK_PLAINTEXT: &[u8] = b"nyx-wallet-master-key";

/// KDF parameters for Argon2id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_memory")]
    pub memory: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory() -> u32 {
    ARGON2_MEMORY_KIB
}

fn default_iterations() -> u32 {
    ARGON2_ITERATIONS
}

fn default_parallelism() -> u32 {
    ARGON2_PARALLELISM
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory: ARGON2_MEMORY_KIB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

/// Persisted description of how to re-derive the master key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterKeyRecord {
    pub version: u32,
    pub kdf: String,
    pub kdf_params: KdfParams,
    /// Hex-encoded salt.
    pub salt: String,
    /// Check value sealed under the master key.
    pub check: SealedKey,
}

/// A secret sealed with AES-256-GCM.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// Hex-encoded nonce.
    pub nonce: String,
    /// Hex-encoded ciphertext.
    pub ciphertext: String,
}

/// The derived master key. Only held in memory while the wallet is unlocked.
pub struct MasterKey(Zeroizing<[u8; 32]>);

impl MasterKey {
    /// Derive a fresh master key for `passphrase`.
    pub fn generate(
        passphrase: &str,
        params: &KdfParams,
    ) -> Result<(MasterKey, MasterKeyRecord), WalletError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let key = MasterKey(derive_key(passphrase, &salt, params)?);
        let check = key.seal_bytes(CHECK_PLAINTEXT)?;
        let record = MasterKeyRecord {
            version: RECORD_VERSION,
            kdf: "argon2id".to_string(),
            kdf_params: params.clone(),
            salt: hex::encode(salt),
            check,
        };
        Ok((key, record))
    }

    /// Re-derive the master key described by `record`.
    pub fn unlock(record: &MasterKeyRecord, passphrase: &str) -> Result<MasterKey, WalletError> {
        if record.version != RECORD_VERSION {
            return Err(WalletError::Key(format!(
                "unsupported master key version: {}",
                record.version
            )));
        }
        let salt = hex::decode(&record.salt)
            .map_err(|e| WalletError::Key(format!("invalid salt hex: {}", e)))?;
        let key = MasterKey(derive_key(passphrase, &salt, &record.kdf_params)?);
        match key.open_bytes(&record.check) {
            Ok(check) if check == CHECK_PLAINTEXT => Ok(key),
            _ => Err(WalletError::WrongPassphrase),
        }
    }

    pub fn seal(&self, spending_key: &SpendingKey) -> Result<SealedKey, WalletError> {
        self.seal_bytes(spending_key.as_bytes())
    }

    pub fn open(&self, sealed: &SealedKey) -> Result<SpendingKey, WalletError> {
        let plaintext = Zeroizing::new(self.open_bytes(sealed)?);
        let bytes: [u8; 32] = plaintext.as_slice().try_into().map_err(|_| {
            WalletError::Key(format!(
                "decrypted key has wrong length: expected 32, got {}",
                plaintext.len()
            ))
        })?;
        Ok(SpendingKey(bytes))
    }

    fn cipher(&self) -> Result<Aes256Gcm, WalletError> {
        Aes256Gcm::new_from_slice(&self.0[..])
            .map_err(|e| WalletError::Key(format!("AES key init failed: {}", e)))
    }

    fn seal_bytes(&self, plaintext: &[u8]) -> Result<SealedKey, WalletError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| WalletError::Key(format!("encryption failed: {}", e)))?;

        Ok(SealedKey {
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        })
    }

    fn open_bytes(&self, sealed: &SealedKey) -> Result<Vec<u8>, WalletError> {
        let nonce_bytes = hex::decode(&sealed.nonce)
            .map_err(|e| WalletError::Key(format!("invalid nonce hex: {}", e)))?;
        let ciphertext = hex::decode(&sealed.ciphertext)
            .map_err(|e| WalletError::Key(format!("invalid ciphertext hex: {}", e)))?;

        if nonce_bytes.len() != NONCE_LEN {
            return Err(WalletError::Key(format!(
                "invalid nonce length: expected {}, got {}",
                NONCE_LEN,
                nonce_bytes.len()
            )));
        }

        self.cipher()?
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| WalletError::WrongPassphrase)
    }
}

/// Derive a 32-byte key from a passphrase and salt using Argon2id.
fn derive_key(
    passphrase: &str,
    salt: &[u8],
    kdf: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let params = Params::new(
        kdf.memory,
        kdf.iterations,
        kdf.parallelism,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| WalletError::Key(format!("Argon2 params error: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut *output)
        .map_err(|e| WalletError::Key(format!("Argon2 hashing failed: {}", e)))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests don't spend seconds in Argon2.
    fn fast() -> KdfParams {
        KdfParams {
            memory: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn seal_open_roundtrip() {
        let (master, _) = MasterKey::generate("hunter2", &fast()).unwrap();
        let key = SpendingKey([42u8; 32]);
        let sealed = master.seal(&key).unwrap();
        assert_eq!(master.open(&sealed).unwrap(), key);
    }

    #[test]
    fn unlock_with_correct_passphrase() {
        let (master, record) = MasterKey::generate("correct", &fast()).unwrap();
        let sealed = master.seal(&SpendingKey([7u8; 32])).unwrap();

        let again = MasterKey::unlock(&record, "correct").unwrap();
        assert_eq!(again.open(&sealed).unwrap(), SpendingKey([7u8; 32]));
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let (_, record) = MasterKey::generate("correct", &fast()).unwrap();
        assert!(matches!(
            MasterKey::unlock(&record, "wrong"),
            Err(WalletError::WrongPassphrase)
        ));
    }

    #[test]
    fn nonces_differ_between_seals() {
        let (master, _) = MasterKey::generate("pass", &fast()).unwrap();
        let key = SpendingKey([1u8; 32]);
        let a = master.seal(&key).unwrap();
        let b = master.seal(&key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn record_serializes_to_json() {
        let (_, record) = MasterKey::generate("pass", &fast()).unwrap();
        let json = serde_json::to_string_pretty(&record).unwrap();
        assert!(json.contains("\"kdf\": \"argon2id\""));
        let back: MasterKeyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unsupported_version_rejected() {
        let (_, mut record) = MasterKey::generate("pass", &fast()).unwrap();
        record.version = 99;
        assert!(matches!(
            MasterKey::unlock(&record, "pass"),
            Err(WalletError::Key(_))
        ));
    }

    #[test]
    fn truncated_nonce_rejected() {
        let (master, _) = MasterKey::generate("pass", &fast()).unwrap();
        let mut sealed = master.seal(&SpendingKey([3u8; 32])).unwrap();
        sealed.nonce.truncate(4);
        assert!(matches!(master.open(&sealed), Err(WalletError::Key(_))));
    }

    #[test]
    fn default_params_match_documented_cost() {
        let params = KdfParams::default();
        assert_eq!(params.memory, 65536);
        assert_eq!(params.iterations, 3);
        assert_eq!(params.parallelism, 1);
    }
}
