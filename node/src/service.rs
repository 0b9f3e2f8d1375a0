//! Background sync loop for one wallet.
//!
//! Every tick runs a maintenance cycle on the blocking pool:
//! scan, expire pending transactions, rebroadcast stale ones, then purge a
//! batch of deleted-account data. A failing step is logged and the next
//! step still runs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use nyx_chain::Chain;
use nyx_store::KvStore;
use nyx_store_lmdb::LmdbEnvironment;
use nyx_types::ChainPosition;
use nyx_wallet_core::{Broadcaster, NoteCrypto, ScanReport, Wallet, WalletError};

use crate::{NodeConfig, NodeError};

/// What one maintenance cycle did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// `None` when the scan was skipped or failed.
    pub scan: Option<ScanReport>,
    pub head: Option<ChainPosition>,
    pub expired: usize,
    pub rebroadcast: usize,
    pub cleaned: usize,
}

pub struct WalletService {
    wallet: Arc<Wallet>,
    chain: Arc<dyn Chain>,
    interval: Duration,
}

impl WalletService {
    pub fn new(wallet: Arc<Wallet>, chain: Arc<dyn Chain>, interval: Duration) -> Self {
        Self {
            wallet,
            chain,
            interval,
        }
    }

    /// Open the LMDB environment under `config.data_dir` and a wallet on top
    /// of it.
    pub fn from_config(
        config: &NodeConfig,
        chain: Arc<dyn Chain>,
        crypto: Arc<dyn NoteCrypto>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self, NodeError> {
        let store = open_store(&config.data_dir, config.map_size)?;
        let wallet = Wallet::open(
            store,
            chain.clone(),
            crypto,
            broadcaster,
            config.wallet.clone(),
        )?;
        tracing::info!(
            data_dir = %config.data_dir.display(),
            interval_ms = config.scan_interval_ms,
            "wallet service ready"
        );
        Ok(Self::new(Arc::new(wallet), chain, config.scan_interval()))
    }

    pub fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    /// Run one maintenance cycle on the calling thread.
    pub fn run_cycle(&self) -> Result<CycleSummary, NodeError> {
        let mut summary = CycleSummary::default();

        match self.wallet.scan() {
            Ok(report) => {
                if report.blocks_connected > 0 || report.blocks_disconnected > 0 {
                    tracing::info!(
                        connected = report.blocks_connected,
                        disconnected = report.blocks_disconnected,
                        accounts = report.accounts_touched,
                        complete = report.complete,
                        "scan cycle"
                    );
                }
                summary.scan = Some(report);
            }
            Err(WalletError::Locked) => tracing::debug!("wallet locked, scan skipped"),
            Err(e) => tracing::warn!(error = %e, "scan failed"),
        }

        summary.head = self.chain.head()?.map(|h| h.position());
        if let Some(head) = summary.head {
            summary.expired = self.wallet.expire_transactions(head.sequence);
            summary.rebroadcast = self.wallet.rebroadcast_transactions(head.sequence);
        }

        let batch = self.wallet.config().cleanup_batch_size;
        match self.wallet.cleanup_deleted_accounts(batch) {
            Ok(cleaned) => summary.cleaned = cleaned,
            Err(e) => tracing::warn!(error = %e, "deleted-account cleanup failed"),
        }

        Ok(summary)
    }

    /// Tick until `shutdown` fires. Returns the number of cycles run.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> Result<u64, NodeError> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(cycles, "wallet service shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let service = Arc::clone(&self);
                    let outcome = tokio::task::spawn_blocking(move || service.run_cycle())
                        .await
                        .map_err(|e| NodeError::Task(e.to_string()))?;
                    if let Err(e) = outcome {
                        tracing::warn!(error = %e, "maintenance cycle failed");
                    }
                    cycles += 1;
                }
            }
        }
        Ok(cycles)
    }
}

/// Open (or create) the wallet's LMDB environment.
pub fn open_store(data_dir: &Path, map_size: usize) -> Result<Arc<dyn KvStore>, NodeError> {
    let env = LmdbEnvironment::open(data_dir, map_size)?;
    Ok(Arc::new(env))
}
