//! Nullable store: thread-safe in-memory key-value storage for testing.
//!
//! Readers get a snapshot of the committed tables. A writer copies the
//! tables, works on the copy, and swaps it in on commit, so an aborted or
//! failed transaction leaves no trace. Writers are serialized.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use nyx_store::{KvPair, KvStore, ReadTxn, StoreError, Table, WriteTxn};

type Tables = Vec<BTreeMap<Vec<u8>, Vec<u8>>>;

pub struct NullStore {
    committed: RwLock<Arc<Tables>>,
    writer: Mutex<()>,
    fail_commits: AtomicUsize,
    commits: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(Arc::new(vec![BTreeMap::new(); Table::ALL.len()])),
            writer: Mutex::new(()),
            fail_commits: AtomicUsize::new(0),
            commits: AtomicU64::new(0),
        }
    }

    /// Make the next `count` commits fail with a backend error.
    pub fn fail_next_commits(&self, count: usize) {
        self.fail_commits.store(count, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of committed entries in `table`.
    pub fn len(&self, table: Table) -> usize {
        self.snapshot()[table.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().iter().all(|t| t.is_empty())
    }

    fn snapshot(&self) -> Arc<Tables> {
        self.committed.read().unwrap().clone()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for NullStore {
    fn read_txn(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError> {
        Ok(Box::new(NullReadTxn {
            tables: self.snapshot(),
        }))
    }

    fn write_txn(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError> {
        let guard = self.writer.lock().unwrap();
        let tables = (*self.snapshot()).clone();
        Ok(Box::new(NullWriteTxn {
            store: self,
            _guard: guard,
            tables,
        }))
    }
}

fn scan(tables: &Tables, table: Table, start: &[u8], end: Option<&[u8]>) -> Vec<KvPair> {
    let upper = match end {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    tables[table.index()]
        .range::<[u8], _>((Bound::Included(start), upper))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

struct NullReadTxn {
    tables: Arc<Tables>,
}

impl ReadTxn for NullReadTxn {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables[table.index()].get(key).cloned())
    }

    fn scan_range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<KvPair>, StoreError> {
        Ok(scan(&self.tables, table, start, end))
    }
}

struct NullWriteTxn<'a> {
    store: &'a NullStore,
    _guard: MutexGuard<'a, ()>,
    tables: Tables,
}

impl ReadTxn for NullWriteTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables[table.index()].get(key).cloned())
    }

    fn scan_range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<KvPair>, StoreError> {
        Ok(scan(&self.tables, table, start, end))
    }
}

impl WriteTxn for NullWriteTxn<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.tables[table.index()].insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.tables[table.index()].remove(key).is_some())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let store = self.store;
        let injected = store
            .fail_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        let NullWriteTxn { tables, _guard, .. } = *self;
        *store.committed.write().unwrap() = Arc::new(tables);
        store.commits.fetch_add(1, Ordering::SeqCst);
        drop(_guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_publishes_writes() {
        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Notes, b"a", b"1").unwrap();
        assert_eq!(store.read_txn().unwrap().get(Table::Notes, b"a").unwrap(), None);
        txn.commit().unwrap();
        assert_eq!(
            store.read_txn().unwrap().get(Table::Notes, b"a").unwrap(),
            Some(b"1".to_vec())
        );
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn dropped_transaction_is_discarded() {
        let store = NullStore::new();
        {
            let mut txn = store.write_txn().unwrap();
            txn.put(Table::Notes, b"a", b"1").unwrap();
        }
        assert!(store.is_empty());
    }

    #[test]
    fn injected_failure_discards_writes() {
        let store = NullStore::new();
        store.fail_next_commits(1);
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Notes, b"a", b"1").unwrap();
        assert!(txn.commit().is_err());
        assert!(store.is_empty());

        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Notes, b"a", b"1").unwrap();
        txn.commit().unwrap();
        assert_eq!(store.len(Table::Notes), 1);
    }

    #[test]
    fn snapshot_is_stable_across_commits() {
        let store = NullStore::new();
        let read = store.read_txn().unwrap();
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Notes, b"a", b"1").unwrap();
        txn.commit().unwrap();
        assert_eq!(read.get(Table::Notes, b"a").unwrap(), None);
    }

    #[test]
    fn range_scan_respects_bounds() {
        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        for k in [[1u8, 0], [1, 5], [2, 0]] {
            txn.put(Table::Notes, &k, b"").unwrap();
        }
        let keys: Vec<_> = txn
            .scan_range(Table::Notes, &[1, 1], Some(&[2, 0]))
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![vec![1, 5]]);
        assert_eq!(txn.scan_prefix(Table::Notes, &[1]).unwrap().len(), 2);
    }
}
