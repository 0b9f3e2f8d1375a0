//! Wallet core library for nyx.
//!
//! Keeps one ledger per account in sync with the local chain:
//! - Account registry with optional passphrase encryption of spending keys
//! - Per-account note, nullifier, and transaction indices ([`AccountLedger`])
//! - Reorg-safe scanning driven by [`nyx_chain::ChainFollower`]
//! - Transaction status derivation and pending-transaction upkeep
//!   (expiry, rebroadcast)
//!
//! Note decryption and broadcasting are injected through the
//! [`NoteCrypto`] and [`Broadcaster`] traits.

pub mod account;
pub mod broadcast;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod ledger;
pub mod lifecycle;
pub mod records;
pub mod registry;
pub mod scan;
pub mod wallet;

pub use account::{Account, AccountImport, SpendKey};
pub use broadcast::Broadcaster;
pub use config::WalletConfig;
pub use crypto::{DerivedKeys, NoteCrypto};
pub use error::WalletError;
pub use keystore::KdfParams;
pub use ledger::AccountLedger;
pub use lifecycle::{transaction_status, TransactionStatus};
pub use records::{AssetBalance, DecryptedNote, NoteRecord, TransactionRecord};
pub use registry::{AccountRegistry, EncryptionStatus};
pub use scan::{ScanCoordinator, ScanReport};
pub use wallet::Wallet;
