use nyx_chain::{ChainError, FollowError};
use nyx_store::StoreError;
use nyx_types::{AccountId, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("an account named {0:?} already exists")]
    DuplicateAccountName(String),

    #[error("an account with the same key material already exists: {0}")]
    DuplicateAccountKey(String),

    #[error("invalid account import: {0}")]
    InvalidImport(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(TxHash),

    #[error("transaction {0} cannot be deleted in its current state")]
    TransactionNotDeletable(TxHash),

    #[error("wallet is locked")]
    Locked,

    #[error("wallet is not encrypted")]
    NotEncrypted,

    #[error("wallet is already encrypted")]
    AlreadyEncrypted,

    #[error("wrong passphrase")]
    WrongPassphrase,

    #[error("key error: {0}")]
    Key(String),

    #[error("balance arithmetic overflow")]
    Overflow,

    #[error("scan failed: {0}")]
    ScanFailed(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("chain follower error: {0}")]
    Follow(#[from] FollowError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
