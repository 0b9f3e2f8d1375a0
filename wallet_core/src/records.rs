//! Records kept in an account's ledger.

use serde::{Deserialize, Serialize};

use nyx_types::{AssetId, BlockHash, ChainPosition, Note, NoteHash, Nullifier, Timestamp, Transaction, TxHash};

/// A note that decrypted under one of our view keys, ready to be recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedNote {
    /// Index of the note within its transaction.
    pub index: usize,
    pub hash: NoteHash,
    pub note: Note,
    /// Position in the note commitment tree. Only known on chain.
    pub position: Option<u64>,
    /// Present only when the account holds the spending key and the position
    /// is known.
    pub nullifier: Option<Nullifier>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub hash: NoteHash,
    pub note: Note,
    /// Transaction that created the note.
    pub transaction: TxHash,
    pub position: Option<u64>,
    pub nullifier: Option<Nullifier>,
    /// Set on chain; `None` while the note only exists in a pending transaction.
    pub sequence: Option<u32>,
    pub block_hash: Option<BlockHash>,
    /// Spent by a transaction that is on chain.
    pub spent: bool,
}

impl NoteRecord {
    pub fn is_on_chain(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn asset_id(&self) -> AssetId {
        self.note.asset_id
    }

    pub fn value(&self) -> u128 {
        self.note.value
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction: Transaction,
    pub block_hash: Option<BlockHash>,
    pub sequence: Option<u32>,
    /// Chain sequence at which the transaction was last handed to the
    /// broadcaster.
    pub submitted_sequence: u32,
    pub timestamp: Timestamp,
}

impl TransactionRecord {
    pub fn hash(&self) -> TxHash {
        self.transaction.hash
    }

    pub fn expiration(&self) -> u32 {
        self.transaction.expiration
    }

    pub fn is_on_chain(&self) -> bool {
        self.block_hash.is_some()
    }
}

/// Balance of one asset for one account, captured at the account head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset_id: AssetId,
    pub confirmed: u128,
    pub unconfirmed: u128,
    pub pending: u128,
    pub unconfirmed_count: u32,
    pub pending_count: u32,
    pub available_notes: u32,
    /// Account head the snapshot was computed at.
    pub head: Option<ChainPosition>,
}
