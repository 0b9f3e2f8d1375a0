//! Note cryptography seam.
//!
//! Decryption and nullifier derivation are protocol-specific and treated as
//! black boxes. Implementations must be deterministic.

use nyx_types::{EncryptedNote, Note, Nullifier, PublicAddress, SpendingKey, ViewKey};

/// Public key material derived from a spending key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedKeys {
    pub view_key: ViewKey,
    pub address: PublicAddress,
}

pub trait NoteCrypto: Send + Sync {
    /// Trial-decrypt a note; `None` when it is not addressed to `view_key`.
    fn decrypt(&self, note: &EncryptedNote, view_key: &ViewKey) -> Option<Note>;

    /// Nullifier revealed when the note at `position` is spent.
    fn compute_nullifier(&self, note: &Note, spending_key: &SpendingKey, position: u64) -> Nullifier;

    fn derive_keys(&self, spending_key: &SpendingKey) -> DerivedKeys;
}
