//! Atomic write batch over an LMDB read-write transaction.
//!
//! Every table lives in the same environment, so a single `RwTxn` covers all
//! of them. Reads through the batch observe its own uncommitted writes.
//! Dropping the batch without calling `commit` aborts it.

use heed::RwTxn;

use nyx_store::{KvPair, ReadTxn, StoreError, Table, WriteTxn};

use crate::environment::scan;
use crate::{LmdbEnvironment, LmdbError};

pub struct WriteBatch<'a> {
    env: &'a LmdbEnvironment,
    txn: RwTxn<'a>,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { env, txn })
    }
}

impl ReadTxn for WriteBatch<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let val = self
            .env
            .db(table)
            .get(&self.txn, key)
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn scan_range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<KvPair>, StoreError> {
        Ok(scan(self.env.db(table), &self.txn, start, end)?)
    }
}

impl WriteTxn for WriteBatch<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.env
            .db(table)
            .put(&mut self.txn, key, value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self
            .env
            .db(table)
            .delete(&mut self.txn, key)
            .map_err(LmdbError::from)?)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let batch = *self;
        batch.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nyx_store::KvStore;

    use super::*;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).unwrap();
        (dir, env)
    }

    #[test]
    fn commit_makes_writes_visible() {
        let (_dir, env) = temp_env();
        let mut txn = env.write_txn().unwrap();
        txn.put(Table::Transactions, b"tx1", b"a").unwrap();
        txn.put(Table::Notes, b"n1", b"b").unwrap();
        txn.commit().unwrap();

        let read = env.read_txn().unwrap();
        assert_eq!(read.get(Table::Transactions, b"tx1").unwrap(), Some(b"a".to_vec()));
        assert_eq!(read.get(Table::Notes, b"n1").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn drop_without_commit_aborts() {
        let (_dir, env) = temp_env();
        {
            let mut txn = env.write_txn().unwrap();
            txn.put(Table::Transactions, b"tx1", b"a").unwrap();
        }
        let read = env.read_txn().unwrap();
        assert_eq!(read.get(Table::Transactions, b"tx1").unwrap(), None);
    }

    #[test]
    fn reads_observe_own_writes() {
        let (_dir, env) = temp_env();
        let mut txn = env.write_txn().unwrap();
        txn.put(Table::Heads, b"acct", b"head").unwrap();
        assert_eq!(txn.get(Table::Heads, b"acct").unwrap(), Some(b"head".to_vec()));
        assert!(txn.delete(Table::Heads, b"acct").unwrap());
        assert!(!txn.delete(Table::Heads, b"acct").unwrap());
        assert_eq!(txn.get(Table::Heads, b"acct").unwrap(), None);
    }

    #[test]
    fn delete_prefix_leaves_neighbours() {
        let (_dir, env) = temp_env();
        let mut txn = env.write_txn().unwrap();
        txn.put(Table::Notes, &[7, 1], b"x").unwrap();
        txn.put(Table::Notes, &[7, 2], b"y").unwrap();
        txn.put(Table::Notes, &[8, 0], b"z").unwrap();
        assert_eq!(txn.delete_prefix(Table::Notes, &[7]).unwrap(), 2);
        txn.commit().unwrap();

        let read = env.read_txn().unwrap();
        assert_eq!(read.scan_prefix(Table::Notes, &[7]).unwrap(), vec![]);
        assert!(read.contains(Table::Notes, &[8, 0]).unwrap());
    }

    #[test]
    fn prefix_of_all_ff_scans_to_end() {
        let (_dir, env) = temp_env();
        let mut txn = env.write_txn().unwrap();
        txn.put(Table::Notes, &[0xff, 0xff, 1], b"x").unwrap();
        txn.put(Table::Notes, &[0xfe], b"y").unwrap();
        let entries = txn.scan_prefix(Table::Notes, &[0xff, 0xff]).unwrap();
        assert_eq!(entries, vec![(vec![0xff, 0xff, 1], b"x".to_vec())]);
    }
}
