//! Single-flight coordination for scan cycles.
//!
//! At most one cycle runs per wallet. A caller arriving while a cycle is in
//! flight blocks until it finishes and receives that cycle's outcome instead
//! of starting another.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use nyx_types::ChainPosition;

use crate::WalletError;

/// Outcome of one scan cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub blocks_connected: u32,
    pub blocks_disconnected: u32,
    /// Distinct accounts that had at least one step applied.
    pub accounts_touched: usize,
    /// Every eligible account reached the chain head.
    pub complete: bool,
    /// Chain head the cycle was working toward.
    pub head: Option<ChainPosition>,
}

#[derive(Default)]
struct ScanState {
    running: bool,
    generation: u64,
    waiters: usize,
    last: Option<Result<ScanReport, String>>,
}

#[derive(Default)]
pub struct ScanCoordinator {
    state: Mutex<ScanState>,
    finished: Condvar,
}

impl ScanCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.lock().waiters
    }

    /// Run `cycle` unless one is already in flight, in which case wait for it
    /// and return its outcome.
    pub fn run<F>(&self, cycle: F) -> Result<ScanReport, WalletError>
    where
        F: FnOnce() -> Result<ScanReport, WalletError>,
    {
        let mut state = self.lock();
        if state.running {
            let generation = state.generation;
            state.waiters += 1;
            while state.running && state.generation == generation {
                state = self
                    .finished
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            state.waiters -= 1;
            return match &state.last {
                Some(Ok(report)) => Ok(report.clone()),
                Some(Err(message)) => Err(WalletError::ScanFailed(message.clone())),
                None => Err(WalletError::ScanFailed("scan ended without an outcome".into())),
            };
        }
        state.running = true;
        drop(state);

        let mut running = Running {
            coordinator: self,
            outcome: None,
        };
        let result = cycle();
        running.outcome = Some(match &result {
            Ok(report) => Ok(report.clone()),
            Err(e) => Err(e.to_string()),
        });
        drop(running);
        result
    }
}

/// Publishes the outcome and wakes waiters, also when the cycle panics.
struct Running<'a> {
    coordinator: &'a ScanCoordinator,
    outcome: Option<Result<ScanReport, String>>,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let mut state = self.coordinator.lock();
        state.running = false;
        state.generation = state.generation.wrapping_add(1);
        state.last = Some(
            self.outcome
                .take()
                .unwrap_or_else(|| Err("scan cycle panicked".to_string())),
        );
        drop(state);
        self.coordinator.finished.notify_all();
    }
}
