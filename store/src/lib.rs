//! Abstract storage traits for the nyx wallet engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The wallet depends only on the traits: an ordered key-value store
//! with named tables, multi-key atomic write transactions that can read their
//! own writes, and range scans over composite keys.

pub mod codec;
pub mod error;
pub mod key;
pub mod meta;
pub mod table;

pub use codec::{decode, encode, get_record, put_record};
pub use error::StoreError;
pub use key::{prefix_upper_bound, KeyBuilder};
pub use table::Table;

/// A key/value pair returned by range scans.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Read access to a consistent snapshot of the store.
pub trait ReadTxn {
    /// Fetch a single value.
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Entries with `start <= key < end` in key order. `end = None` scans to
    /// the end of the table.
    fn scan_range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<KvPair>, StoreError>;

    /// Entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<Vec<KvPair>, StoreError> {
        let upper = prefix_upper_bound(prefix);
        self.scan_range(table, prefix, upper.as_deref())
    }

    fn contains(&self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(table, key)?.is_some())
    }
}

/// Writable transaction handle (extends ReadTxn with read-your-writes).
///
/// Nothing is visible to other transactions until [`WriteTxn::commit`].
/// Dropping the handle without committing aborts every write.
pub trait WriteTxn: ReadTxn {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove a key. Returns whether it existed.
    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError>;

    /// Remove every key starting with `prefix`. Returns how many were removed.
    fn delete_prefix(&mut self, table: Table, prefix: &[u8]) -> Result<u64, StoreError> {
        let keys: Vec<Vec<u8>> = self
            .scan_prefix(table, prefix)?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        let mut removed = 0;
        for key in keys {
            if self.delete(table, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// A transactional store. Implementations must be shareable across threads;
/// individual transaction handles need not be.
pub trait KvStore: Send + Sync {
    fn read_txn(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError>;
    fn write_txn(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError>;
}
