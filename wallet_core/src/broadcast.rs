use nyx_types::Transaction;

/// Hands transactions to the node's mempool / gossip layer.
pub trait Broadcaster: Send + Sync {
    /// Returns whether the transaction was accepted locally. Acceptance says
    /// nothing about eventual inclusion.
    fn announce(&self, transaction: &Transaction) -> bool;
}
