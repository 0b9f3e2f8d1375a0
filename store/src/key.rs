//! Composite binary keys.
//!
//! Integers are encoded big-endian so lexicographic key order equals numeric
//! order, which is what makes sequence- and expiration-keyed indices
//! range-scannable.

use nyx_types::AccountId;

/// Builds `account_id ++ part ++ part ...` keys.
#[derive(Clone, Debug, Default)]
pub struct KeyBuilder(Vec<u8>);

impl KeyBuilder {
    pub fn new() -> Self {
        Self(Vec::with_capacity(64))
    }

    /// Start a key under an account's prefix.
    pub fn account(id: &AccountId) -> Self {
        Self::new().bytes(id.as_bytes())
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

/// The smallest key greater than every key starting with `prefix`, or `None`
/// when no such key exists (empty or all-`0xFF` prefix).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last != u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Read a big-endian `u32` at `offset`.
pub fn read_u32(key: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = key.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Read a 32-byte component at `offset`.
pub fn read_32(key: &[u8], offset: usize) -> Option<[u8; 32]> {
    key.get(offset..offset + 32)?.try_into().ok()
}
