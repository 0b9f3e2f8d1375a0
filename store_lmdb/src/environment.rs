//! LMDB environment setup.

use std::ops::Bound;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};

use nyx_store::{KvPair, KvStore, ReadTxn, StoreError, Table, WriteTxn};

use crate::{LmdbError, Migrator, ReadSnapshot, WriteBatch};

/// Wraps the LMDB environment and one database handle per table.
pub struct LmdbEnvironment {
    env: Env,
    dbs: Vec<Database<Bytes, Bytes>>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, create every
    /// table, and bring the schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never accessed outside heed's API.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut dbs = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            dbs.push(env.create_database::<Bytes, Bytes>(&mut wtxn, Some(table.name()))?);
        }
        wtxn.commit()?;

        let environment = Self { env, dbs };
        Migrator::run(&environment)?;
        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    pub(crate) fn db(&self, table: Table) -> Database<Bytes, Bytes> {
        self.dbs[table.index()]
    }

    /// Number of entries in a table.
    pub fn len(&self, table: Table) -> Result<u64, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db(table).len(&rtxn)?)
    }
}

impl KvStore for LmdbEnvironment {
    fn read_txn(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError> {
        Ok(Box::new(ReadSnapshot::new(self)?))
    }

    fn write_txn(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError> {
        Ok(Box::new(WriteBatch::new(self)?))
    }
}

/// Range scan shared by read snapshots and write batches.
pub(crate) fn scan(
    db: Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    start: &[u8],
    end: Option<&[u8]>,
) -> Result<Vec<KvPair>, LmdbError> {
    let upper = match end {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    let bounds = (Bound::Included(start), upper);
    let iter = db.range(txn, &bounds)?;
    let mut results = Vec::new();
    for entry in iter {
        let (key, val) = entry?;
        results.push((key.to_vec(), val.to_vec()));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: open a temporary LMDB environment.
    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    #[test]
    fn open_creates_every_table_empty() {
        let (_dir, env) = temp_env();
        for table in Table::ALL {
            if table == Table::Meta {
                continue;
            }
            assert_eq!(env.len(table).unwrap(), 0, "{} should be empty", table.name());
        }
    }

    #[test]
    fn reopen_preserves_committed_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
            let mut txn = env.write_txn().unwrap();
            txn.put(Table::Accounts, b"alice", b"record").unwrap();
            txn.commit().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let txn = env.read_txn().unwrap();
        assert_eq!(
            txn.get(Table::Accounts, b"alice").unwrap(),
            Some(b"record".to_vec())
        );
    }

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let (_dir, env) = temp_env();
        let mut txn = env.write_txn().unwrap();
        txn.put(Table::Notes, &[1, 2], b"b").unwrap();
        txn.put(Table::Notes, &[1, 1], b"a").unwrap();
        txn.put(Table::Notes, &[2, 0], b"other").unwrap();
        txn.put(Table::Notes, &[0, 9], b"before").unwrap();
        txn.commit().unwrap();

        let txn = env.read_txn().unwrap();
        let entries = txn.scan_prefix(Table::Notes, &[1]).unwrap();
        assert_eq!(
            entries,
            vec![(vec![1, 1], b"a".to_vec()), (vec![1, 2], b"b".to_vec())]
        );
    }

    #[test]
    fn tables_are_separate_keyspaces() {
        let (_dir, env) = temp_env();
        let mut txn = env.write_txn().unwrap();
        txn.put(Table::Notes, b"k", b"note").unwrap();
        txn.commit().unwrap();

        let txn = env.read_txn().unwrap();
        assert_eq!(txn.get(Table::Transactions, b"k").unwrap(), None);
    }
}
