//! Wallet tuning knobs.

use serde::{Deserialize, Serialize};

use crate::keystore::KdfParams;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Blocks on top of a transaction before it counts as confirmed.
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,

    /// Upper bound on connect/disconnect steps applied per scan cycle.
    #[serde(default = "default_max_blocks_per_scan")]
    pub max_blocks_per_scan: usize,

    /// Blocks a pending transaction may sit unseen before it is announced again.
    #[serde(default = "default_rebroadcast_after")]
    pub rebroadcast_after: u32,

    /// Entries purged per `cleanup_deleted_accounts` call.
    #[serde(default = "default_cleanup_batch_size")]
    pub cleanup_batch_size: usize,

    /// Argon2id cost used when encrypting the wallet.
    #[serde(default)]
    pub kdf: KdfParams,
}

fn default_confirmations() -> u32 {
    2
}

fn default_max_blocks_per_scan() -> usize {
    1000
}

fn default_rebroadcast_after() -> u32 {
    10
}

fn default_cleanup_batch_size() -> usize {
    1000
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            confirmations: default_confirmations(),
            max_blocks_per_scan: default_max_blocks_per_scan(),
            rebroadcast_after: default_rebroadcast_after(),
            cleanup_batch_size: default_cleanup_batch_size(),
            kdf: KdfParams::default(),
        }
    }
}
