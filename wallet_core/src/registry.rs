//! In-memory account registry and encryption-at-rest state.
//!
//! The registry mirrors the `Accounts` table and tracks whether spending keys
//! are stored in the clear or sealed under a passphrase-derived master key:
//!
//! ```text
//!   Plaintext --encrypt--> Unlocked <--unlock-- Locked
//!       ^                     |  \                 ^
//!       +-------decrypt-------+   +------lock------+
//! ```
//!
//! `decrypt` also works from `Locked` given the passphrase. While locked,
//! anything that needs a spending key fails with [`WalletError::Locked`].
//! The registry never writes to storage; the wallet persists a change first
//! and then applies it here.

use std::collections::HashMap;
use std::fmt;

use nyx_store::{get_record, meta::MASTER_KEY_KEY, ReadTxn, Table};
use nyx_types::{AccountId, SpendingKey, ViewKey};

use crate::account::{Account, SpendKey};
use crate::keystore::{MasterKey, MasterKeyRecord};
use crate::WalletError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionStatus {
    Plaintext,
    Locked,
    Unlocked,
}

impl fmt::Display for EncryptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EncryptionStatus::Plaintext => "plaintext",
            EncryptionStatus::Locked => "locked",
            EncryptionStatus::Unlocked => "unlocked",
        };
        f.write_str(s)
    }
}

enum KeyState {
    Plaintext,
    Locked,
    Unlocked(MasterKey),
}

pub struct AccountRegistry {
    accounts: HashMap<AccountId, Account>,
    names: HashMap<String, AccountId>,
    keys: KeyState,
}

impl AccountRegistry {
    /// Rebuild the registry from the `Accounts` table. An encrypted wallet
    /// always starts locked.
    pub fn load<R: ReadTxn + ?Sized>(txn: &R) -> Result<Self, WalletError> {
        let mut registry = Self {
            accounts: HashMap::new(),
            names: HashMap::new(),
            keys: KeyState::Plaintext,
        };
        for (_, value) in txn.scan_range(Table::Accounts, &[], None)? {
            let account: Account = nyx_store::decode(&value)?;
            registry.insert(account);
        }
        if txn.contains(Table::Meta, MASTER_KEY_KEY)? {
            registry.keys = KeyState::Locked;
        }
        Ok(registry)
    }

    pub fn status(&self) -> EncryptionStatus {
        match self.keys {
            KeyState::Plaintext => EncryptionStatus::Plaintext,
            KeyState::Locked => EncryptionStatus::Locked,
            KeyState::Unlocked(_) => EncryptionStatus::Unlocked,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.keys, KeyState::Locked)
    }

    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Account> {
        self.names.get(name).and_then(|id| self.accounts.get(id))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Reject a new account whose name or view key is already taken.
    pub fn check_unique(&self, name: &str, view_key: &ViewKey) -> Result<(), WalletError> {
        if self.names.contains_key(name) {
            return Err(WalletError::DuplicateAccountName(name.to_string()));
        }
        if let Some(existing) = self.accounts.values().find(|a| a.view_key == *view_key) {
            return Err(WalletError::DuplicateAccountKey(existing.name.clone()));
        }
        Ok(())
    }

    pub fn check_name(&self, name: &str) -> Result<(), WalletError> {
        if self.names.contains_key(name) {
            return Err(WalletError::DuplicateAccountName(name.to_string()));
        }
        Ok(())
    }

    /// Insert or replace an account.
    pub fn insert(&mut self, account: Account) {
        if let Some(previous) = self.accounts.get(&account.id) {
            self.names.remove(&previous.name);
        }
        self.names.insert(account.name.clone(), account.id);
        self.accounts.insert(account.id, account);
    }

    pub fn remove(&mut self, id: &AccountId) -> Option<Account> {
        let account = self.accounts.remove(id)?;
        self.names.remove(&account.name);
        Some(account)
    }

    // ── Key material ────────────────────────────────────────────────────

    /// The account's spending key in the clear, `None` for view-only
    /// accounts.
    pub fn spending_key(&self, account: &Account) -> Result<Option<SpendingKey>, WalletError> {
        match (&account.spending_key, &self.keys) {
            (SpendKey::None, _) => Ok(None),
            (SpendKey::Plain(key), _) => Ok(Some(key.clone())),
            (SpendKey::Sealed(sealed), KeyState::Unlocked(master)) => master.open(sealed).map(Some),
            (SpendKey::Sealed(_), KeyState::Locked) => Err(WalletError::Locked),
            (SpendKey::Sealed(_), KeyState::Plaintext) => Err(WalletError::Key(format!(
                "account {} holds a sealed key in an unencrypted wallet",
                account.id
            ))),
        }
    }

    /// Wrap a fresh spending key the way this wallet stores keys.
    pub fn protect(&self, spending_key: SpendingKey) -> Result<SpendKey, WalletError> {
        match &self.keys {
            KeyState::Plaintext => Ok(SpendKey::Plain(spending_key)),
            KeyState::Unlocked(master) => Ok(SpendKey::Sealed(master.seal(&spending_key)?)),
            KeyState::Locked => Err(WalletError::Locked),
        }
    }

    /// Every account with its key sealed under `master`. Does not modify the
    /// registry.
    pub(crate) fn sealed_accounts(&self, master: &MasterKey) -> Result<Vec<Account>, WalletError> {
        if !matches!(self.keys, KeyState::Plaintext) {
            return Err(WalletError::AlreadyEncrypted);
        }
        let mut sealed = Vec::with_capacity(self.accounts.len());
        for account in self.accounts.values() {
            let mut account = account.clone();
            if let SpendKey::Plain(key) = &account.spending_key {
                account.spending_key = SpendKey::Sealed(master.seal(key)?);
            }
            sealed.push(account);
        }
        Ok(sealed)
    }

    /// Every account with its key opened under `master`. Does not modify the
    /// registry.
    pub(crate) fn opened_accounts(&self, master: &MasterKey) -> Result<Vec<Account>, WalletError> {
        if matches!(self.keys, KeyState::Plaintext) {
            return Err(WalletError::NotEncrypted);
        }
        let mut opened = Vec::with_capacity(self.accounts.len());
        for account in self.accounts.values() {
            let mut account = account.clone();
            if let SpendKey::Sealed(sealed) = &account.spending_key {
                account.spending_key = SpendKey::Plain(master.open(sealed)?);
            }
            opened.push(account);
        }
        Ok(opened)
    }

    pub(crate) fn set_unlocked(&mut self, master: MasterKey) {
        self.keys = KeyState::Unlocked(master);
    }

    pub(crate) fn set_plaintext(&mut self) {
        self.keys = KeyState::Plaintext;
    }

    /// Forget the master key.
    pub fn lock(&mut self) -> Result<(), WalletError> {
        match self.keys {
            KeyState::Plaintext => Err(WalletError::NotEncrypted),
            _ => {
                self.keys = KeyState::Locked;
                Ok(())
            }
        }
    }
}

/// Read the persisted master key description, if the wallet is encrypted.
pub(crate) fn master_key_record<R: ReadTxn + ?Sized>(
    txn: &R,
) -> Result<Option<MasterKeyRecord>, WalletError> {
    Ok(get_record(txn, Table::Meta, MASTER_KEY_KEY)?)
}
