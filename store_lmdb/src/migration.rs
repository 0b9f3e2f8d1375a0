//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta table and
//! runs sequential migration functions to bring an older database up to date.

use nyx_store::meta::{get_schema_version, set_schema_version};
use nyx_store::{KvStore, StoreError, WriteTxn};

use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Runs database migrations to bring the schema up to date.
pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - If the stored version matches `CURRENT_SCHEMA_VERSION`, this is a no-op.
    /// - If the stored version is *higher* than what this code supports, the
    ///   database was written by a newer build and we refuse to open it.
    pub fn run(store: &impl KvStore) -> Result<(), LmdbError> {
        let mut txn = store.write_txn()?;
        let current = get_schema_version(&*txn)?;

        if current == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = current, "database schema is up to date");
            return Ok(());
        }

        if current > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: current,
                supported: CURRENT_SCHEMA_VERSION,
            }
            .into());
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(&mut *txn, version, version + 1)?;
        }

        set_schema_version(&mut *txn, CURRENT_SCHEMA_VERSION)?;
        txn.commit()?;

        tracing::info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(())
    }
}

fn run_migration<W: WriteTxn + ?Sized>(_txn: &mut W, from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        // Initial schema, nothing to migrate from a blank slate.
        (0, 1) => Ok(()),
        _ => Err(LmdbError::Heed(format!(
            "unknown migration: {} -> {}",
            from, to
        ))),
    }
}
