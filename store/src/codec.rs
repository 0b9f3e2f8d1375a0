//! Typed record access on top of raw byte tables (bincode encoding).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ReadTxn, StoreError, Table, WriteTxn};

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Fetch and decode a record.
pub fn get_record<T, R>(txn: &R, table: Table, key: &[u8]) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadTxn + ?Sized,
{
    txn.get(table, key)?.map(|bytes| decode(&bytes)).transpose()
}

/// Encode and store a record.
pub fn put_record<T, W>(txn: &mut W, table: Table, key: &[u8], value: &T) -> Result<(), StoreError>
where
    T: Serialize,
    W: WriteTxn + ?Sized,
{
    let bytes = encode(value)?;
    txn.put(table, key, &bytes)
}
