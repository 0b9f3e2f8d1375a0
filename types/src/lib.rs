//! Fundamental types for the nyx wallet engine.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: hashes, chain positions, block headers, transactions, notes,
//! key material, account identifiers, and timestamps.

pub mod account;
pub mod block;
pub mod error;
pub mod hash;
pub mod keys;
pub mod note;
pub mod time;
pub mod transaction;

pub use account::AccountId;
pub use block::{BlockHeader, ChainPosition};
pub use error::TypesError;
pub use hash::{AssetId, BlockHash, NoteHash, Nullifier, TxHash};
pub use keys::{PublicAddress, SpendingKey, ViewKey};
pub use note::Note;
pub use time::Timestamp;
pub use transaction::{EncryptedNote, Transaction};
