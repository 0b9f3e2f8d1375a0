//! Decrypted note plaintext.

use serde::{Deserialize, Serialize};

use crate::{AssetId, PublicAddress};

/// The plaintext of a note after a successful decryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub owner: PublicAddress,
    pub asset_id: AssetId,
    /// Value in base units of `asset_id`.
    pub value: u128,
    #[serde(default)]
    pub memo: Vec<u8>,
}
