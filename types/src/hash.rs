//! 32-byte identifiers: block, transaction and note hashes, nullifiers,
//! and asset ids.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Build from a slice that must be exactly 32 bytes long.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
                    what: stringify!($name),
                    expected: 32,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}\u{2026})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(&self.0))
            }
        }
    };
}

hash_type! {
    /// Identifies a block on the chain.
    BlockHash
}

hash_type! {
    /// Identifies a transaction.
    TxHash
}

hash_type! {
    /// Identifies a note commitment.
    NoteHash
}

hash_type! {
    /// One-time token revealed when a note is spent.
    Nullifier
}

hash_type! {
    /// Identifies the asset a note carries.
    AssetId
}

impl AssetId {
    /// The chain's native asset.
    pub const NATIVE: Self = Self([0u8; 32]);
}

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
pub(crate) mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = TxHash::from_slice(&[1u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            TypesError::InvalidLength { expected: 32, actual: 31, .. }
        ));
    }

    #[test]
    fn display_is_full_hex() {
        let hash = BlockHash::new([0xab; 32]);
        assert_eq!(hash.to_string(), "ab".repeat(32));
    }

    #[test]
    fn debug_is_abbreviated() {
        let hash = NoteHash::new([0x01; 32]);
        assert_eq!(format!("{:?}", hash), "NoteHash(01010101\u{2026})");
    }

    #[test]
    fn native_asset_is_zero() {
        assert!(AssetId::NATIVE.is_zero());
    }
}
