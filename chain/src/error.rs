use nyx_types::{BlockHash, ChainPosition};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("block not found: {0}")]
    MissingBlock(BlockHash),

    #[error("chain backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum FollowError {
    /// The stored position references a block the chain does not know.
    /// The caller is expected to reset to a null position and rescan.
    #[error("stored position {0} is unknown to the chain")]
    PositionUnrecoverable(ChainPosition),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
