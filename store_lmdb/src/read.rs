//! Read-only snapshot over an LMDB read transaction.

use heed::RoTxn;

use nyx_store::{KvPair, ReadTxn, StoreError, Table};

use crate::environment::scan;
use crate::{LmdbEnvironment, LmdbError};

/// A consistent view of every table as of the moment it was opened.
pub struct ReadSnapshot<'a> {
    env: &'a LmdbEnvironment,
    txn: RoTxn<'a>,
}

impl<'a> ReadSnapshot<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().read_txn().map_err(LmdbError::from)?;
        Ok(Self { env, txn })
    }
}

impl ReadTxn for ReadSnapshot<'_> {
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
