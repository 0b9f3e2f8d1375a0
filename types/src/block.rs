//! Block headers and chain positions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BlockHash, Timestamp};

/// A point on the chain: block hash plus its sequence (height).
///
/// Used for account heads, account creation markers, and the chain
/// follower's stored position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainPosition {
    pub hash: BlockHash,
    pub sequence: u32,
}

impl ChainPosition {
    pub fn new(hash: BlockHash, sequence: u32) -> Self {
        Self { hash, sequence }
    }
}

impl fmt::Display for ChainPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hash, self.sequence)
    }
}

/// Header of a block as exposed by the chain collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub hash: BlockHash,
    /// Parent block hash; `BlockHash::ZERO` for genesis.
    pub previous: BlockHash,
    /// Genesis has sequence 1.
    pub sequence: u32,
    pub timestamp: Timestamp,
    /// Size of the note commitment tree after this block is applied.
    pub note_size: u64,
}

impl BlockHeader {
    pub fn position(&self) -> ChainPosition {
        ChainPosition::new(self.hash, self.sequence)
    }

    /// Position of this block's parent, or `None` for genesis.
    pub fn previous_position(&self) -> Option<ChainPosition> {
        if self.is_genesis() {
            None
        } else {
            Some(ChainPosition::new(self.previous, self.sequence - 1))
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.previous.is_zero()
    }
}
