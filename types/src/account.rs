//! Account identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::hex;
use crate::TypesError;

/// Opaque 16-byte account identity.
///
/// Also the key prefix for every per-account storage index, so all ids have
/// the same length and prefix scans never bleed into a neighbouring account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 16]);

impl AccountId {
    pub const LEN: usize = 16;

    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            what: "AccountId",
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", hex::encode(&self.0))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}
