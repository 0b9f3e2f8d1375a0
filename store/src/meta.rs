//! Metadata stored in [`Table::Meta`].
//!
//! A small key-value area for internal bookkeeping that doesn't belong to any
//! account: the schema version, the chain follower's position, and the
//! encryption parameters of the account registry.

use crate::{ReadTxn, StoreError, Table, WriteTxn};

pub const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
pub const CHAIN_POSITION_KEY: &[u8] = b"chain_position";
pub const MASTER_KEY_KEY: &[u8] = b"master_key";

/// Stored schema version; `0` for a fresh database.
pub fn get_schema_version<R: ReadTxn + ?Sized>(txn: &R) -> Result<u32, StoreError> {
    match txn.get(Table::Meta, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                StoreError::Corruption("schema_version has unexpected byte length".to_string())
            })?;
            Ok(u32::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

pub fn set_schema_version<W: WriteTxn + ?Sized>(txn: &mut W, version: u32) -> Result<(), StoreError> {
    txn.put(Table::Meta, SCHEMA_VERSION_KEY, &version.to_le_bytes())
}
