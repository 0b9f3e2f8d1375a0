//! The chain oracle consumed by the wallet.

use nyx_types::{BlockHash, BlockHeader, Transaction};

use crate::ChainError;

/// Read-only view of the node's block index.
///
/// Backends implement the primitive lookups; ancestry helpers are derived
/// from them.
pub trait Chain: Send + Sync {
    /// The canonical tip, or `None` before genesis has been stored.
    fn head(&self) -> Result<Option<BlockHeader>, ChainError>;

    /// Header for any known block, canonical or not.
    fn header(&self, hash: &BlockHash) -> Result<Option<BlockHeader>, ChainError>;

    /// Canonical header at `sequence`.
    fn header_at(&self, sequence: u32) -> Result<Option<BlockHeader>, ChainError>;

    /// Transactions of a block in block order.
    fn transactions(&self, hash: &BlockHash) -> Result<Vec<Transaction>, ChainError>;

    fn contains(&self, hash: &BlockHash) -> Result<bool, ChainError> {
        Ok(self.header(hash)?.is_some())
    }

    fn is_canonical(&self, hash: &BlockHash) -> Result<bool, ChainError> {
        let Some(header) = self.header(hash)? else {
            return Ok(false);
        };
        Ok(self
            .header_at(header.sequence)?
            .is_some_and(|canonical| canonical.hash == header.hash))
    }

    /// Latest common ancestor of two blocks, or `None` if they share no
    /// history (different genesis).
    fn find_fork(
        &self,
        a: &BlockHeader,
        b: &BlockHeader,
    ) -> Result<Option<BlockHeader>, ChainError> {
        let mut a = a.clone();
        let mut b = b.clone();

        while a.sequence > b.sequence {
            match self.parent(&a)? {
                Some(parent) => a = parent,
                None => return Ok(None),
            }
        }
        while b.sequence > a.sequence {
            match self.parent(&b)? {
                Some(parent) => b = parent,
                None => return Ok(None),
            }
        }

        while a.hash != b.hash {
            match (self.parent(&a)?, self.parent(&b)?) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(a))
    }

    /// Parent header, `None` for genesis.
    fn parent(&self, header: &BlockHeader) -> Result<Option<BlockHeader>, ChainError> {
        if header.is_genesis() {
            return Ok(None);
        }
        self.header(&header.previous)?
            .map(Some)
            .ok_or(ChainError::MissingBlock(header.previous))
    }
}
