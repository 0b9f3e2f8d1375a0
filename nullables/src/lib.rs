//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Every collaborator of the wallet (storage, chain, note crypto, broadcast)
//! sits behind a trait. This crate provides test-friendly implementations
//! that:
//! - Return deterministic values
//! - Can be controlled programmatically (reorgs, failing commits, rejections)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod broadcaster;
pub mod chain;
pub mod crypto;
pub mod hash;
pub mod store;

pub use broadcaster::NullBroadcaster;
pub use chain::NullChain;
pub use crypto::NullCrypto;
pub use store::NullStore;
