//! Nullable note crypto: transparent, deterministic stand-in for the
//! protocol's note encryption.
//!
//! "Encryption" serializes the note alongside a counter; "decryption"
//! succeeds when the note's owner is the address derived from the view key.
//! Keys and nullifiers are Blake2b-256 derivations, so the same inputs
//! always produce the same outputs.

use std::sync::atomic::{AtomicU64, Ordering};

use nyx_types::{
    AssetId, EncryptedNote, Note, NoteHash, Nullifier, PublicAddress, SpendingKey, Transaction,
    TxHash, ViewKey,
};
use nyx_wallet_core::{DerivedKeys, NoteCrypto};

use crate::hash::blake2b_256_multi;

#[derive(Default)]
pub struct NullCrypto {
    counter: AtomicU64,
}

impl NullCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn address_for(view_key: &ViewKey) -> PublicAddress {
        PublicAddress(blake2b_256_multi(&[b"address", view_key.as_bytes()]))
    }

    pub fn encrypt(&self, note: &Note) -> EncryptedNote {
        let nonce = self.next();
        let ciphertext = bincode::serialize(&(nonce, note)).unwrap_or_default();
        EncryptedNote {
            hash: NoteHash::new(blake2b_256_multi(&[b"note", &ciphertext])),
            ciphertext,
        }
    }

    /// Native-asset note for `owner`.
    pub fn note(owner: PublicAddress, value: u128) -> Note {
        Note {
            owner,
            asset_id: AssetId::NATIVE,
            value,
            memo: Vec::new(),
        }
    }

    /// Build a transaction with a unique hash.
    pub fn transaction(
        &self,
        spends: Vec<Nullifier>,
        outputs: &[Note],
        fee: u128,
        expiration: u32,
    ) -> Transaction {
        let notes: Vec<EncryptedNote> = outputs.iter().map(|n| self.encrypt(n)).collect();
        let nonce = self.next();
        let mut parts: Vec<&[u8]> = vec![b"tx"];
        let nonce_bytes = nonce.to_be_bytes();
        parts.push(&nonce_bytes);
        for nullifier in &spends {
            parts.push(nullifier.as_bytes());
        }
        for note in &notes {
            parts.push(note.hash.as_bytes());
        }
        Transaction {
            hash: TxHash::new(blake2b_256_multi(&parts)),
            fee,
            expiration,
            spends,
            notes,
        }
    }

    /// Miner's fee transaction paying `value` to `owner`.
    pub fn coinbase(&self, owner: PublicAddress, value: u128) -> Transaction {
        self.transaction(Vec::new(), &[Self::note(owner, value)], 0, 0)
    }
}

impl NoteCrypto for NullCrypto {
    fn decrypt(&self, note: &EncryptedNote, view_key: &ViewKey) -> Option<Note> {
        let (_, decoded): (u64, Note) = bincode::deserialize(&note.ciphertext).ok()?;
        (decoded.owner == Self::address_for(view_key)).then_some(decoded)
    }

    fn compute_nullifier(&self, note: &Note, spending_key: &SpendingKey, position: u64) -> Nullifier {
        let encoded = bincode::serialize(note).unwrap_or_default();
        Nullifier::new(blake2b_256_multi(&[
            b"nullifier",
            spending_key.as_bytes(),
            &encoded,
            &position.to_be_bytes(),
        ]))
    }

    fn derive_keys(&self, spending_key: &SpendingKey) -> DerivedKeys {
        let view_key = ViewKey(blake2b_256_multi(&[b"view", spending_key.as_bytes()]));
        let address = Self::address_for(&view_key);
        DerivedKeys { view_key, address }
    }
}
