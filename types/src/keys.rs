//! Account key material.
//!
//! The spending key authorizes spends and derives nullifiers; the view key
//! decrypts incoming notes; the public address is what notes are sent to.
//! Derivation between them belongs to the crypto collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hash::hex;

/// A 32-byte spending key. Bytes are zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SpendingKey(pub [u8; 32]);

impl SpendingKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendingKey(<redacted>)")
    }
}

/// A 32-byte incoming view key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ViewKey(pub [u8; 32]);

impl ViewKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViewKey(<redacted>)")
    }
}

/// A 32-byte public address notes are sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicAddress(pub [u8; 32]);

impl PublicAddress {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_keys_do_not_leak_through_debug() {
        let spend = SpendingKey([7u8; 32]);
        let view = ViewKey([8u8; 32]);
        assert_eq!(format!("{:?}", spend), "SpendingKey(<redacted>)");
        assert_eq!(format!("{:?}", view), "ViewKey(<redacted>)");
    }
}
