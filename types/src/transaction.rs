//! Transactions as seen by the wallet: the nullifiers they reveal and the
//! encrypted notes they create.

use serde::{Deserialize, Serialize};

use crate::{NoteHash, Nullifier, TxHash};

/// An output note as it appears on the wire. Only its owner can decrypt it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedNote {
    pub hash: NoteHash,
    pub ciphertext: Vec<u8>,
}

/// A shielded transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    /// Fee paid in the native asset.
    pub fee: u128,
    /// Last sequence (exclusive) at which this transaction may be mined;
    /// `0` means it never expires.
    pub expiration: u32,
    /// Nullifiers of the notes this transaction spends.
    pub spends: Vec<Nullifier>,
    /// Notes created by this transaction, in tree order.
    pub notes: Vec<EncryptedNote>,
}

impl Transaction {
    /// Whether the transaction spends or creates nothing.
    pub fn is_empty(&self) -> bool {
        self.spends.is_empty() && self.notes.is_empty()
    }

    /// A miner's reward transaction: creates notes without spending any.
    pub fn is_miners_fee(&self) -> bool {
        self.spends.is_empty() && !self.notes.is_empty()
    }
}
