//! Nullable chain: an in-memory block tree with a movable canonical tip.
//!
//! Blocks are added on top of any known block; [`NullChain::set_head`]
//! switches the canonical chain to simulate a reorganization.

use std::collections::HashMap;
use std::sync::Mutex;

use nyx_chain::{Chain, ChainError};
use nyx_types::{BlockHash, BlockHeader, Timestamp, Transaction};

use crate::hash::blake2b_256_multi;

#[derive(Default)]
struct ChainState {
    headers: HashMap<BlockHash, BlockHeader>,
    transactions: HashMap<BlockHash, Vec<Transaction>>,
    canonical: Vec<BlockHash>,
    nonce: u64,
}

#[derive(Default)]
pub struct NullChain {
    state: Mutex<ChainState>,
}

impl NullChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block to the canonical tip and make it the new head.
    pub fn extend(&self, transactions: Vec<Transaction>) -> BlockHeader {
        let tip = self.head().ok().flatten();
        let block = self.add_block(tip.as_ref(), transactions);
        self.set_head(&block);
        block
    }

    /// Append `count` empty blocks to the canonical tip.
    pub fn extend_empty(&self, count: u32) -> Vec<BlockHeader> {
        (0..count).map(|_| self.extend(Vec::new())).collect()
    }

    /// Add a block on top of `parent` (genesis when `None`) without changing
    /// the canonical chain.
    pub fn add_block(&self, parent: Option<&BlockHeader>, transactions: Vec<Transaction>) -> BlockHeader {
        let mut state = self.state.lock().unwrap();
        state.nonce += 1;

        let sequence = parent.map_or(1, |p| p.sequence + 1);
        let previous = parent.map_or(BlockHash::ZERO, |p| p.hash);
        let notes: u64 = transactions.iter().map(|t| t.notes.len() as u64).sum();
        let note_size = parent.map_or(0, |p| p.note_size) + notes;
        let hash = BlockHash::new(blake2b_256_multi(&[
            previous.as_bytes(),
            &sequence.to_be_bytes(),
            &state.nonce.to_be_bytes(),
        ]));

        let header = BlockHeader {
            hash,
            previous,
            sequence,
            timestamp: Timestamp::new(sequence as u64 * 60_000),
            note_size,
        };
        state.headers.insert(hash, header.clone());
        state.transactions.insert(hash, transactions);
        header
    }

    /// Make `tip` and its ancestors the canonical chain.
    pub fn set_head(&self, tip: &BlockHeader) {
        let mut state = self.state.lock().unwrap();
        let mut path = vec![tip.hash];
        let mut cursor = tip.clone();
        while !cursor.is_genesis() {
            cursor = state.headers[&cursor.previous].clone();
            path.push(cursor.hash);
        }
        path.reverse();
        state.canonical = path;
    }

    /// Forget a block entirely, as if it had been pruned.
    pub fn forget(&self, hash: &BlockHash) {
        let mut state = self.state.lock().unwrap();
        state.headers.remove(hash);
        state.transactions.remove(hash);
        state.canonical.retain(|h| h != hash);
    }
}

impl Chain for NullChain {
    fn head(&self) -> Result<Option<BlockHeader>, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(state.canonical.last().map(|h| state.headers[h].clone()))
    }

    fn header(&self, hash: &BlockHash) -> Result<Option<BlockHeader>, ChainError> {
        Ok(self.state.lock().unwrap().headers.get(hash).cloned())
    }

    fn header_at(&self, sequence: u32) -> Result<Option<BlockHeader>, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(sequence
            .checked_sub(1)
            .and_then(|i| state.canonical.get(i as usize))
            .and_then(|h| state.headers.get(h))
            .cloned())
    }

    fn transactions(&self, hash: &BlockHash) -> Result<Vec<Transaction>, ChainError> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .get(hash)
            .cloned()
            .ok_or(ChainError::MissingBlock(*hash))
    }
}
