use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("wallet error: {0}")]
    Wallet(#[from] nyx_wallet_core::WalletError),

    #[error("store error: {0}")]
    Store(#[from] nyx_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] nyx_store_lmdb::LmdbError),

    #[error("chain error: {0}")]
    Chain(#[from] nyx_chain::ChainError),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
