//! Hosting for the nyx wallet: TOML configuration, structured logging,
//! LMDB-backed storage, graceful shutdown, and the background loop that keeps
//! the wallet in sync with the chain.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use service::{open_store, CycleSummary, WalletService};
pub use shutdown::ShutdownController;
