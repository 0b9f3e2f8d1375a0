//! Account records and their import/export form.

use serde::{Deserialize, Serialize};

use nyx_types::{AccountId, ChainPosition, PublicAddress, SpendingKey, ViewKey};

use crate::keystore::SealedKey;
use crate::WalletError;

/// Spending authority held by an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendKey {
    /// View-only account.
    None,
    Plain(SpendingKey),
    Sealed(SealedKey),
}

impl SpendKey {
    pub fn is_none(&self) -> bool {
        matches!(self, SpendKey::None)
    }
}

/// Persisted account record. The account head lives in its own table since
/// it changes with every block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub view_key: ViewKey,
    pub address: PublicAddress,
    pub spending_key: SpendKey,
    pub scanning_enabled: bool,
    /// Earliest block that can hold this account's notes. `None` means scan
    /// from genesis.
    pub created_at: Option<ChainPosition>,
}

impl Account {
    pub fn is_view_only(&self) -> bool {
        self.spending_key.is_none()
    }

    /// Whether notes in a block at `sequence` can belong to this account.
    pub fn should_decrypt(&self, sequence: u32) -> bool {
        self.created_at.map_or(true, |c| c.sequence <= sequence)
    }
}

/// Portable JSON form of an account, used both for export and import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountImport {
    pub version: u32,
    pub name: String,
    /// Hex-encoded spending key; absent for view-only accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spending_key: Option<String>,
    /// Hex-encoded view key.
    pub view_key: String,
    /// Hex-encoded public address.
    pub address: String,
    #[serde(default)]
    pub created_at: Option<ChainPosition>,
}

pub const ACCOUNT_EXPORT_VERSION: u32 = 1;

impl AccountImport {
    pub fn from_json(json: &str) -> Result<Self, WalletError> {
        serde_json::from_str(json).map_err(|e| WalletError::InvalidImport(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, WalletError> {
        serde_json::to_string_pretty(self).map_err(|e| WalletError::Serialization(e.to_string()))
    }

    pub(crate) fn spending_key(&self) -> Result<Option<SpendingKey>, WalletError> {
        self.spending_key
            .as_deref()
            .map(|s| decode_32(s, "spending key").map(SpendingKey))
            .transpose()
    }

    pub(crate) fn view_key(&self) -> Result<ViewKey, WalletError> {
        decode_32(&self.view_key, "view key").map(ViewKey)
    }

    pub(crate) fn address(&self) -> Result<PublicAddress, WalletError> {
        decode_32(&self.address, "address").map(PublicAddress)
    }
}

fn decode_32(s: &str, what: &str) -> Result<[u8; 32], WalletError> {
    let bytes = hex::decode(s).map_err(|e| WalletError::InvalidImport(format!("{what}: {e}")))?;
    bytes.as_slice().try_into().map_err(|_| {
        WalletError::InvalidImport(format!("{what}: expected 32 bytes, got {}", bytes.len()))
    })
}
