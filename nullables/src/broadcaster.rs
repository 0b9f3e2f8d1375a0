//! Nullable broadcaster: record announcements without sending them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use nyx_types::{Transaction, TxHash};
use nyx_wallet_core::Broadcaster;

pub struct NullBroadcaster {
    announced: Mutex<Vec<TxHash>>,
    accepting: AtomicBool,
}

impl NullBroadcaster {
    pub fn new() -> Self {
        Self {
            announced: Mutex::new(Vec::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Make subsequent announcements succeed or fail.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Every transaction handed to `announce`, in order, accepted or not.
    pub fn announced(&self) -> Vec<TxHash> {
        self.announced.lock().unwrap().clone()
    }
}

impl Default for NullBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for NullBroadcaster {
    fn announce(&self, transaction: &Transaction) -> bool {
        self.announced.lock().unwrap().push(transaction.hash);
        self.accepting.load(Ordering::SeqCst)
    }
}
