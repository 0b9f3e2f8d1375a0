//! Graceful shutdown for the wallet service.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a shutdown signal to every
//! background task through a `tokio::sync::broadcast` channel.

use tokio::signal;
use tokio::sync::broadcast;

/// Tasks call [`ShutdownController::subscribe`] and `select!` on the receiver
/// alongside their main loop.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> Result<(), std::io::Error> {
        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                result = signal::ctrl_c() => {
                    result?;
                    tracing::info!("received SIGINT, shutting down");
                }
                _ = terminate.recv() => { tracing::info!("received SIGTERM, shutting down"); }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            tracing::info!("received SIGINT, shutting down");
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
