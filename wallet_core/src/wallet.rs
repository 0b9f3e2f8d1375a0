//! The wallet: accounts, chain scanning, and pending-transaction upkeep.
//!
//! A [`Wallet`] owns the account registry and drives every account ledger
//! from one [`ChainFollower`]. Each connect or disconnect step is applied to
//! every account positioned on that block inside a single write transaction,
//! together with the new account heads and the shared follower position, so
//! accounts never drift apart across a crash or a failed commit.
//!
//! Mutating operations are serialized by `write_guard`. Reads take a store
//! snapshot and the registry read lock and never wait for a scan step.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use nyx_chain::{Chain, ChainFollower, Step};
use nyx_store::meta::{CHAIN_POSITION_KEY, MASTER_KEY_KEY};
use nyx_store::{get_record, put_record, KvStore, ReadTxn, Table, WriteTxn};
use nyx_types::{
    AccountId, AssetId, BlockHeader, ChainPosition, SpendingKey, Transaction, TxHash, ViewKey,
};

use crate::account::{Account, AccountImport, SpendKey, ACCOUNT_EXPORT_VERSION};
use crate::broadcast::Broadcaster;
use crate::config::WalletConfig;
use crate::crypto::NoteCrypto;
use crate::keystore::MasterKey;
use crate::ledger::AccountLedger;
use crate::lifecycle::{self, is_expired_sequence, TransactionStatus};
use crate::records::{AssetBalance, DecryptedNote, NoteRecord, TransactionRecord};
use crate::registry::{master_key_record, AccountRegistry, EncryptionStatus};
use crate::scan::{ScanCoordinator, ScanReport};
use crate::WalletError;

pub struct Wallet {
    store: Arc<dyn KvStore>,
    chain: Arc<dyn Chain>,
    crypto: Arc<dyn NoteCrypto>,
    broadcaster: Arc<dyn Broadcaster>,
    config: WalletConfig,
    registry: RwLock<AccountRegistry>,
    write_guard: Mutex<()>,
    scan: ScanCoordinator,
}

/// An account taking part in one scan step, with its key opened.
struct Participant {
    account: Account,
    spending_key: Option<SpendingKey>,
}

impl Wallet {
    /// Load the account registry from `store`. An encrypted wallet opens
    /// locked.
    pub fn open(
        store: Arc<dyn KvStore>,
        chain: Arc<dyn Chain>,
        crypto: Arc<dyn NoteCrypto>,
        broadcaster: Arc<dyn Broadcaster>,
        config: WalletConfig,
    ) -> Result<Self, WalletError> {
        let registry = {
            let txn = store.read_txn()?;
            AccountRegistry::load(&*txn)?
        };
        tracing::info!(
            accounts = registry.len(),
            encryption = %registry.status(),
            "wallet opened"
        );
        Ok(Self {
            store,
            chain,
            crypto,
            broadcaster,
            config,
            registry: RwLock::new(registry),
            write_guard: Mutex::new(()),
            scan: ScanCoordinator::new(),
        })
    }

    /// Tuning the wallet was opened with.
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    fn registry(&self) -> RwLockReadGuard<'_, AccountRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, AccountRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Accounts ────────────────────────────────────────────────────────

    /// All accounts, sorted by name.
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.registry().accounts().cloned().collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        accounts
    }

    /// Look up an account by id.
    pub fn account(&self, id: &AccountId) -> Option<Account> {
        self.registry().get(id).cloned()
    }

    /// Look up an account by its unique name.
    pub fn account_by_name(&self, name: &str) -> Option<Account> {
        self.registry().by_name(name).cloned()
    }

    /// Last block applied to the account's ledger; `None` before genesis.
    pub fn account_head(&self, id: &AccountId) -> Result<Option<ChainPosition>, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        read_head(&*txn, id)
    }

    /// Last block fully applied by the scanner.
    pub fn chain_position(&self) -> Result<Option<ChainPosition>, WalletError> {
        let txn = self.store.read_txn()?;
        Ok(get_record::<Option<ChainPosition>, _>(&*txn, Table::Meta, CHAIN_POSITION_KEY)?.flatten())
    }

    /// Generate a new account. `created_at` defaults to the chain head.
    pub fn create_account(
        &self,
        name: &str,
        created_at: Option<ChainPosition>,
    ) -> Result<Account, WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        registry.check_name(name)?;

        let spending_key = SpendingKey(rand::random());
        let keys = self.crypto.derive_keys(&spending_key);
        registry.check_unique(name, &keys.view_key)?;
        let spending_key = registry.protect(spending_key)?;

        let (created_at, head) = match created_at {
            Some(position) => self.locate_created_at(position)?,
            None => {
                let head = self.chain.head()?.map(|h| h.position());
                (head, head)
            }
        };

        let mut txn = self.store.write_txn()?;
        let account = Account {
            id: fresh_account_id(&registry, &*txn)?,
            name: name.to_string(),
            view_key: keys.view_key,
            address: keys.address,
            spending_key,
            scanning_enabled: true,
            created_at,
        };
        write_account(&mut *txn, &account)?;
        write_head(&mut *txn, &account.id, head)?;
        txn.commit()?;

        tracing::info!(account = %account.id, name, created_at = ?account.created_at, "created account");
        registry.insert(account.clone());
        Ok(account)
    }

    /// Import an account from its exported form. Without a spending key the
    /// account is view-only.
    pub fn import_account(&self, import: AccountImport) -> Result<Account, WalletError> {
        if import.version != ACCOUNT_EXPORT_VERSION {
            return Err(WalletError::InvalidImport(format!(
                "unsupported export version {}",
                import.version
            )));
        }
        let view_key = import.view_key()?;
        let address = import.address()?;
        let spending_key = import.spending_key()?;
        if let Some(key) = &spending_key {
            let derived = self.crypto.derive_keys(key);
            if derived.view_key != view_key || derived.address != address {
                return Err(WalletError::InvalidImport(
                    "spending key does not match view key or address".into(),
                ));
            }
        }

        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        registry.check_unique(&import.name, &view_key)?;
        let spending_key = match spending_key {
            Some(key) => registry.protect(key)?,
            None => SpendKey::None,
        };
        let (created_at, head) = match import.created_at {
            Some(position) => self.locate_created_at(position)?,
            None => {
                let head = self.chain.head()?.map(|h| h.position());
                (head, head)
            }
        };

        let mut txn = self.store.write_txn()?;
        let account = Account {
            id: fresh_account_id(&registry, &*txn)?,
            name: import.name,
            view_key,
            address,
            spending_key,
            scanning_enabled: true,
            created_at,
        };
        write_account(&mut *txn, &account)?;
        write_head(&mut *txn, &account.id, head)?;
        txn.commit()?;

        tracing::info!(
            account = %account.id,
            name = %account.name,
            view_only = account.is_view_only(),
            created_at = ?account.created_at,
            "imported account"
        );
        registry.insert(account.clone());
        Ok(account)
    }

    /// Serialize an account to JSON for [`import_account`](Self::import_account).
    pub fn export_account(
        &self,
        id: &AccountId,
        include_spending_key: bool,
    ) -> Result<String, WalletError> {
        let registry = self.registry();
        let account = registry.get(id).ok_or(WalletError::AccountNotFound(*id))?;
        let spending_key = if include_spending_key {
            registry
                .spending_key(account)?
                .map(|key| hex::encode(key.as_bytes()))
        } else {
            None
        };
        AccountImport {
            version: ACCOUNT_EXPORT_VERSION,
            name: account.name.clone(),
            spending_key,
            view_key: hex::encode(account.view_key.as_bytes()),
            address: hex::encode(account.address.as_bytes()),
            created_at: account.created_at,
        }
        .to_json()
    }

    /// Give an account a new name. Fails if another account holds it.
    pub fn rename_account(&self, id: &AccountId, name: &str) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        let mut account = registry.get(id).cloned().ok_or(WalletError::AccountNotFound(*id))?;
        if account.name == name {
            return Ok(());
        }
        registry.check_name(name)?;
        account.name = name.to_string();

        let mut txn = self.store.write_txn()?;
        write_account(&mut *txn, &account)?;
        txn.commit()?;
        registry.insert(account);
        Ok(())
    }

    /// Pause or resume scanning for one account. Takes effect at the next
    /// block boundary of a running scan.
    pub fn set_scanning_enabled(&self, id: &AccountId, enabled: bool) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        let mut account = registry.get(id).cloned().ok_or(WalletError::AccountNotFound(*id))?;
        if account.scanning_enabled == enabled {
            return Ok(());
        }
        account.scanning_enabled = enabled;

        let mut txn = self.store.write_txn()?;
        write_account(&mut *txn, &account)?;
        txn.commit()?;
        tracing::info!(account = %id, enabled, "scanning toggled");
        registry.insert(account);
        Ok(())
    }

    /// Replace an account with a successor that shares its keys and name but
    /// starts from an empty ledger under a new id. The old id's data is
    /// queued for [`cleanup_deleted_accounts`](Self::cleanup_deleted_accounts).
    pub fn reset_account(
        &self,
        id: &AccountId,
        reset_created_at: bool,
        reset_scanning_enabled: bool,
    ) -> Result<Account, WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        let old = registry.get(id).cloned().ok_or(WalletError::AccountNotFound(*id))?;
        if registry.is_locked() && !old.is_view_only() {
            return Err(WalletError::Locked);
        }

        let (created_at, head) = match old.created_at {
            Some(position) if !reset_created_at => self.locate_created_at(position)?,
            _ => (None, None),
        };

        let mut txn = self.store.write_txn()?;
        let account = Account {
            id: fresh_account_id(&registry, &*txn)?,
            scanning_enabled: reset_scanning_enabled || old.scanning_enabled,
            created_at,
            ..old.clone()
        };
        retire_account(&mut *txn, &old.id)?;
        write_account(&mut *txn, &account)?;
        write_head(&mut *txn, &account.id, head)?;
        txn.commit()?;

        tracing::info!(old = %old.id, new = %account.id, name = %account.name, "reset account");
        registry.remove(&old.id);
        registry.insert(account.clone());
        Ok(account)
    }

    /// Drop an account. Its ledger is purged later by
    /// [`cleanup_deleted_accounts`](Self::cleanup_deleted_accounts).
    pub fn remove_account(&self, id: &AccountId) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        self.require_in(&registry, id)?;

        let mut txn = self.store.write_txn()?;
        retire_account(&mut *txn, id)?;
        txn.commit()?;

        tracing::info!(account = %id, "removed account");
        registry.remove(id);
        Ok(())
    }

    /// Physically delete up to `limit` entries belonging to retired
    /// accounts. Returns the number of entries removed.
    pub fn cleanup_deleted_accounts(&self, limit: usize) -> Result<usize, WalletError> {
        let _guard = self.write_lock();
        let mut txn = self.store.write_txn()?;
        let queued = txn.scan_range(Table::AccountsToDelete, &[], None)?;
        if queued.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        for (key, _) in queued {
            let id = AccountId::from_slice(&key)
                .map_err(|e| nyx_store::StoreError::Corruption(e.to_string()))?;
            let (count, done) = AccountLedger::new(id).clear_limited(&mut *txn, limit - removed)?;
            removed += count;
            if done {
                txn.delete(Table::AccountsToDelete, &key)?;
                tracing::debug!(account = %id, "purged retired account");
            }
            if removed == limit {
                break;
            }
        }
        txn.commit()?;
        Ok(removed)
    }

    // ── Encryption ──────────────────────────────────────────────────────

    /// Whether spending keys are stored in the clear, sealed and locked, or
    /// sealed and unlocked.
    pub fn encryption_status(&self) -> EncryptionStatus {
        self.registry().status()
    }

    /// Seal every spending key under a key derived from `passphrase`. The
    /// wallet stays unlocked afterwards.
    pub fn encrypt(&self, passphrase: &str) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        if registry.status() != EncryptionStatus::Plaintext {
            return Err(WalletError::AlreadyEncrypted);
        }
        let (master, record) = MasterKey::generate(passphrase, &self.config.kdf)?;
        let sealed = registry.sealed_accounts(&master)?;

        let mut txn = self.store.write_txn()?;
        for account in &sealed {
            write_account(&mut *txn, account)?;
        }
        put_record(&mut *txn, Table::Meta, MASTER_KEY_KEY, &record)?;
        txn.commit()?;

        for account in sealed {
            registry.insert(account);
        }
        registry.set_unlocked(master);
        tracing::info!("wallet encrypted");
        Ok(())
    }

    /// Store every spending key in the clear again.
    pub fn decrypt(&self, passphrase: &str) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        if registry.status() == EncryptionStatus::Plaintext {
            return Err(WalletError::NotEncrypted);
        }
        let master = self.derive_master(passphrase)?;
        let opened = registry.opened_accounts(&master)?;

        let mut txn = self.store.write_txn()?;
        for account in &opened {
            write_account(&mut *txn, account)?;
        }
        txn.delete(Table::Meta, MASTER_KEY_KEY)?;
        txn.commit()?;

        for account in opened {
            registry.insert(account);
        }
        registry.set_plaintext();
        tracing::info!("wallet decrypted");
        Ok(())
    }

    /// Derive the master key from `passphrase` and keep it in memory until
    /// [`lock`](Self::lock).
    pub fn unlock(&self, passphrase: &str) -> Result<(), WalletError> {
        let mut registry = self.registry_mut();
        match registry.status() {
            EncryptionStatus::Plaintext => Err(WalletError::NotEncrypted),
            EncryptionStatus::Unlocked => Ok(()),
            EncryptionStatus::Locked => {
                let master = self.derive_master(passphrase)?;
                registry.set_unlocked(master);
                tracing::info!("wallet unlocked");
                Ok(())
            }
        }
    }

    /// Forget the master key. Operations that need a spending key fail with
    /// [`WalletError::Locked`] until the next unlock.
    pub fn lock(&self) -> Result<(), WalletError> {
        self.registry_mut().lock()?;
        tracing::info!("wallet locked");
        Ok(())
    }

    fn derive_master(&self, passphrase: &str) -> Result<MasterKey, WalletError> {
        let txn = self.store.read_txn()?;
        let record = master_key_record(&*txn)?.ok_or(WalletError::NotEncrypted)?;
        MasterKey::unlock(&record, passphrase)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Balance of one asset at the account head. `confirmations` defaults to
    /// the configured depth.
    pub fn get_balance(
        &self,
        id: &AccountId,
        asset: AssetId,
        confirmations: Option<u32>,
    ) -> Result<AssetBalance, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        let head = read_head(&*txn, id)?;
        AccountLedger::new(*id).get_balance(
            &*txn,
            head,
            asset,
            confirmations.unwrap_or(self.config.confirmations),
        )
    }

    /// Balances of every asset the account holds, native asset included.
    pub fn get_balances(
        &self,
        id: &AccountId,
        confirmations: Option<u32>,
    ) -> Result<Vec<AssetBalance>, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        let head = read_head(&*txn, id)?;
        AccountLedger::new(*id).get_balances(
            &*txn,
            head,
            confirmations.unwrap_or(self.config.confirmations),
        )
    }

    /// Confirmed notes free to spend, for coin selection.
    pub fn unspent_notes(
        &self,
        id: &AccountId,
        asset: AssetId,
        confirmations: Option<u32>,
    ) -> Result<Vec<NoteRecord>, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        let head = read_head(&*txn, id)?;
        AccountLedger::new(*id).unspent_notes(
            &*txn,
            head,
            asset,
            confirmations.unwrap_or(self.config.confirmations),
        )
    }

    /// The account's record of a transaction, if it has one.
    pub fn get_transaction(
        &self,
        id: &AccountId,
        hash: &TxHash,
    ) -> Result<Option<TransactionRecord>, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        AccountLedger::new(*id).get_transaction(&*txn, hash)
    }

    /// Status of a transaction as seen by one account.
    pub fn transaction_status(
        &self,
        id: &AccountId,
        hash: &TxHash,
    ) -> Result<TransactionStatus, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        let Some(record) = AccountLedger::new(*id).get_transaction(&*txn, hash)? else {
            return Ok(TransactionStatus::Unknown);
        };
        let head = read_head(&*txn, id)?;
        Ok(lifecycle::transaction_status(
            &record,
            head,
            self.config.confirmations,
            None,
        ))
    }

    /// On-chain history in sequence order followed by pending transactions.
    pub fn transactions(&self, id: &AccountId) -> Result<Vec<TransactionRecord>, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        let ledger = AccountLedger::new(*id);
        let mut records = ledger.transactions_by_sequence(&*txn)?;
        records.extend(
            ledger
                .transactions(&*txn)?
                .into_iter()
                .filter(|record| !record.is_on_chain()),
        );
        Ok(records)
    }

    /// Unmined transactions on record, ordered by expiration.
    pub fn pending_transactions(
        &self,
        id: &AccountId,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        self.require(id)?;
        let txn = self.store.read_txn()?;
        AccountLedger::new(*id).pending_transactions(&*txn)
    }

    fn require(&self, id: &AccountId) -> Result<(), WalletError> {
        self.require_in(&self.registry(), id)
    }

    fn require_in(&self, registry: &AccountRegistry, id: &AccountId) -> Result<(), WalletError> {
        if registry.contains(id) {
            Ok(())
        } else {
            Err(WalletError::AccountNotFound(*id))
        }
    }

    // ── Pending transactions ────────────────────────────────────────────

    /// Record a locally created transaction as pending in every account it
    /// touches, then optionally hand it to the broadcaster. Returns the
    /// accounts that recorded it.
    pub fn submit_transaction(
        &self,
        transaction: &Transaction,
        broadcast: bool,
    ) -> Result<Vec<AccountId>, WalletError> {
        validate_transaction(transaction)?;
        let submitted_sequence = self.chain.head()?.map_or(0, |h| h.sequence);

        let added = {
            let _guard = self.write_lock();
            let accounts: Vec<Account> = self.registry().accounts().cloned().collect();
            let mut txn = self.store.write_txn()?;
            let mut added = Vec::new();
            for account in &accounts {
                let notes = decrypt_transaction(
                    &*self.crypto,
                    &account.view_key,
                    None,
                    transaction,
                    None,
                );
                if AccountLedger::new(account.id).add_pending_transaction(
                    &mut *txn,
                    transaction,
                    &notes,
                    submitted_sequence,
                )? {
                    added.push(account.id);
                }
            }
            txn.commit()?;
            added
        };

        tracing::info!(
            tx = %transaction.hash,
            accounts = added.len(),
            expiration = transaction.expiration,
            "submitted transaction"
        );
        if broadcast && !self.broadcaster.announce(transaction) {
            tracing::warn!(tx = %transaction.hash, "broadcaster rejected transaction");
        }
        Ok(added)
    }

    /// Delete a pending or expired transaction from one account.
    pub fn delete_transaction(&self, id: &AccountId, hash: &TxHash) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        self.require(id)?;
        let mut txn = self.store.write_txn()?;
        let head_sequence = read_head(&*txn, id)?.map_or(0, |h| h.sequence);
        AccountLedger::new(*id).delete_transaction(&mut *txn, hash, head_sequence)?;
        txn.commit()?;
        Ok(())
    }

    /// Expire every pending transaction whose nonzero expiration is at or
    /// below `head_sequence`. Failures are logged and skipped. Returns the
    /// number of (account, transaction) pairs expired.
    pub fn expire_transactions(&self, head_sequence: u32) -> usize {
        let mut expired = 0;
        for id in self.account_ids() {
            let pending = match self.pending_transactions(&id) {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::warn!(account = %id, error = %e, "failed to list pending transactions");
                    continue;
                }
            };
            for record in pending {
                if !is_expired_sequence(record.expiration(), head_sequence) {
                    continue;
                }
                match self.expire_one(&id, &record.hash(), head_sequence) {
                    Ok(true) => expired += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(
                        account = %id,
                        tx = %record.hash(),
                        error = %e,
                        "failed to expire transaction"
                    ),
                }
            }
        }
        if expired > 0 {
            tracing::info!(expired, head_sequence, "expired pending transactions");
        }
        expired
    }

    fn expire_one(
        &self,
        id: &AccountId,
        hash: &TxHash,
        head_sequence: u32,
    ) -> Result<bool, WalletError> {
        let _guard = self.write_lock();
        let mut txn = self.store.write_txn()?;
        let expired = AccountLedger::new(*id).expire_transaction(&mut *txn, hash, head_sequence)?;
        if expired {
            txn.commit()?;
        }
        Ok(expired)
    }

    /// Announce again every live pending transaction that has not been
    /// submitted for more than `rebroadcast_after` blocks. Returns how many
    /// distinct transactions the broadcaster accepted.
    pub fn rebroadcast_transactions(&self, head_sequence: u32) -> usize {
        let mut announced = HashSet::new();
        let mut accepted = 0;
        for id in self.account_ids() {
            let pending = match self.pending_transactions(&id) {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::warn!(account = %id, error = %e, "failed to list pending transactions");
                    continue;
                }
            };
            for record in pending {
                let hash = record.hash();
                if is_expired_sequence(record.expiration(), head_sequence)
                    || record.submitted_sequence.saturating_add(self.config.rebroadcast_after)
                        >= head_sequence
                {
                    continue;
                }
                if announced.insert(hash) {
                    if self.broadcaster.announce(&record.transaction) {
                        accepted += 1;
                    } else {
                        tracing::warn!(tx = %hash, "broadcaster rejected rebroadcast");
                    }
                }
                if let Err(e) = self.mark_submitted(&id, &hash, head_sequence.saturating_add(1)) {
                    tracing::warn!(account = %id, tx = %hash, error = %e, "failed to update submitted sequence");
                }
            }
        }
        if !announced.is_empty() {
            tracing::debug!(announced = announced.len(), accepted, head_sequence, "rebroadcast sweep");
        }
        accepted
    }

    fn mark_submitted(&self, id: &AccountId, hash: &TxHash, sequence: u32) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut txn = self.store.write_txn()?;
        AccountLedger::new(*id).update_submitted_sequence(&mut *txn, hash, sequence)?;
        txn.commit()?;
        Ok(())
    }

    fn account_ids(&self) -> Vec<AccountId> {
        self.registry().accounts().map(|a| a.id).collect()
    }

    // ── Scanning ────────────────────────────────────────────────────────

    /// Bring every scanning-enabled account up to the canonical head, at most
    /// `max_blocks_per_scan` steps per call. A concurrent caller waits for
    /// the running cycle and shares its report.
    pub fn scan(&self) -> Result<ScanReport, WalletError> {
        self.scan.run(|| self.scan_cycle())
    }

    fn scan_cycle(&self) -> Result<ScanReport, WalletError> {
        let mut report = ScanReport::default();
        if self.registry().is_locked() {
            return Err(WalletError::Locked);
        }
        self.recover_positions()?;

        let follower = ChainFollower::new(&*self.chain);
        let mut touched = HashSet::new();
        let mut budget = self.config.max_blocks_per_scan;
        loop {
            let Some(target) = self.chain.head()? else {
                report.complete = true;
                break;
            };
            report.head = Some(target.position());

            let heads = self.eligible_heads()?;
            let Some(start) = self.start_position(&heads)? else {
                report.complete = true;
                break;
            };
            if start == Some(target.position()) {
                report.complete = true;
                break;
            }
            if budget == 0 {
                break;
            }

            let mut progressed = false;
            for step in follower.advance(start, &target, budget)? {
                let step = step?;
                let accounts = self.apply_step(&step)?;
                match step {
                    Step::Connect(_) => report.blocks_connected += 1,
                    Step::Disconnect(_) => report.blocks_disconnected += 1,
                }
                touched.extend(accounts);
                budget -= 1;
                progressed = true;
            }
            if !progressed {
                break;
            }
        }

        report.accounts_touched = touched.len();
        tracing::info!(
            connected = report.blocks_connected,
            disconnected = report.blocks_disconnected,
            accounts = report.accounts_touched,
            complete = report.complete,
            head = ?report.head,
            "scan cycle finished"
        );
        Ok(report)
    }

    /// Heads of the accounts that take part in scanning.
    fn eligible_heads(&self) -> Result<Vec<Option<ChainPosition>>, WalletError> {
        let ids: Vec<AccountId> = self
            .registry()
            .accounts()
            .filter(|a| a.scanning_enabled)
            .map(|a| a.id)
            .collect();
        let txn = self.store.read_txn()?;
        ids.iter().map(|id| read_head(&*txn, id)).collect()
    }

    /// Where the next advance starts: a head stranded on a stale fork first,
    /// otherwise the lowest head. `None` when no account is eligible.
    fn start_position(
        &self,
        heads: &[Option<ChainPosition>],
    ) -> Result<Option<Option<ChainPosition>>, WalletError> {
        for head in heads.iter().flatten() {
            if !self.chain.is_canonical(&head.hash)? {
                return Ok(Some(Some(*head)));
            }
        }
        Ok(heads.iter().copied().min_by_key(|h| h.map(|p| p.sequence)))
    }

    /// Reset every position the chain no longer knows. An account whose head
    /// vanished loses its ledger and rescans from genesis.
    fn recover_positions(&self) -> Result<(), WalletError> {
        let _guard = self.write_lock();
        let mut registry = self.registry_mut();
        let mut txn = self.store.write_txn()?;
        let mut dirty = false;
        let mut updated = Vec::new();

        for account in registry.accounts() {
            if let Some(head) = read_head(&*txn, &account.id)? {
                if !self.chain.contains(&head.hash)? {
                    tracing::warn!(
                        account = %account.id,
                        head = %head,
                        "account head unknown to chain, rescanning from genesis"
                    );
                    AccountLedger::new(account.id).clear(&mut *txn)?;
                    write_head(&mut *txn, &account.id, None)?;
                    dirty = true;
                }
            }
            if let Some(created_at) = account.created_at {
                if !self.chain.contains(&created_at.hash)? {
                    tracing::warn!(
                        account = %account.id,
                        created_at = %created_at,
                        "creation block unknown to chain, clearing"
                    );
                    let mut account = account.clone();
                    account.created_at = None;
                    write_account(&mut *txn, &account)?;
                    updated.push(account);
                    dirty = true;
                }
            }
        }

        let position: Option<ChainPosition> =
            get_record::<Option<ChainPosition>, _>(&*txn, Table::Meta, CHAIN_POSITION_KEY)?.flatten();
        if let Some(position) = position {
            if !self.chain.contains(&position.hash)? {
                tracing::warn!(position = %position, "scan position unknown to chain, resetting");
                put_record(&mut *txn, Table::Meta, CHAIN_POSITION_KEY, &None::<ChainPosition>)?;
                dirty = true;
            }
        }

        if dirty {
            txn.commit()?;
            for account in updated {
                registry.insert(account);
            }
        }
        Ok(())
    }

    /// Apply one step to every eligible account positioned on it, in one
    /// write transaction. Returns the accounts it touched.
    fn apply_step(&self, step: &Step) -> Result<Vec<AccountId>, WalletError> {
        let _guard = self.write_lock();
        let block = step.block();

        let candidates: Vec<Participant> = {
            let registry = self.registry();
            registry
                .accounts()
                .filter(|a| a.scanning_enabled)
                .map(|account| {
                    Ok(Participant {
                        spending_key: registry.spending_key(account)?,
                        account: account.clone(),
                    })
                })
                .collect::<Result<_, WalletError>>()?
        };

        let mut txn = self.store.write_txn()?;
        let mut participants = Vec::new();
        for participant in candidates {
            let head = read_head(&*txn, &participant.account.id)?;
            let positioned = match step {
                Step::Disconnect(_) => head == Some(block.position()),
                Step::Connect(_) => head == block.previous_position(),
            };
            if positioned {
                participants.push(participant);
            }
        }

        let transactions = if participants.is_empty() {
            Vec::new()
        } else {
            self.chain.transactions(&block.hash)?
        };

        let mut updated = Vec::new();
        match step {
            Step::Disconnect(block) => {
                for Participant { account, .. } in &participants {
                    let ledger = AccountLedger::new(account.id);
                    for transaction in transactions.iter().rev() {
                        ledger.disconnect_transaction(&mut *txn, block, transaction)?;
                    }
                    write_head(&mut *txn, &account.id, block.previous_position())?;
                    if account.created_at.is_some_and(|c| c.sequence >= block.sequence) {
                        let mut account = account.clone();
                        account.created_at = block.previous_position();
                        write_account(&mut *txn, &account)?;
                        updated.push(account);
                    }
                }
            }
            Step::Connect(block) => {
                let decrypted = self.decrypt_block(block, &transactions, &participants)?;
                for (Participant { account, .. }, notes) in participants.iter().zip(decrypted) {
                    if let Some(notes) = notes {
                        let ledger = AccountLedger::new(account.id);
                        for (transaction, notes) in transactions.iter().zip(notes) {
                            ledger.connect_transaction(&mut *txn, block, transaction, &notes)?;
                        }
                    }
                    write_head(&mut *txn, &account.id, Some(block.position()))?;
                }
            }
        }

        put_record(
            &mut *txn,
            Table::Meta,
            CHAIN_POSITION_KEY,
            &step.resulting_position(),
        )?;
        txn.commit()?;

        if !updated.is_empty() {
            let mut registry = self.registry_mut();
            for account in updated {
                tracing::debug!(account = %account.id, created_at = ?account.created_at, "rolled back creation block");
                registry.insert(account);
            }
        }

        tracing::debug!(
            step = if matches!(step, Step::Connect(_)) { "connect" } else { "disconnect" },
            sequence = block.sequence,
            hash = %block.hash,
            accounts = participants.len(),
            transactions = transactions.len(),
            "applied block"
        );
        Ok(participants.iter().map(|p| p.account.id).collect())
    }

    /// Trial-decrypt a block's notes for every participant in parallel.
    /// `None` for accounts created after the block, which skip it.
    fn decrypt_block(
        &self,
        block: &BlockHeader,
        transactions: &[Transaction],
        participants: &[Participant],
    ) -> Result<Vec<Option<Vec<Vec<DecryptedNote>>>>, WalletError> {
        let total: u64 = transactions.iter().map(|t| t.notes.len() as u64).sum();
        let first = block.note_size.checked_sub(total).ok_or_else(|| {
            WalletError::InvalidBlock(format!(
                "block {} holds {} notes but the tree only has {}",
                block.hash, total, block.note_size
            ))
        })?;
        let mut offsets = Vec::with_capacity(transactions.len());
        let mut position = first;
        for transaction in transactions {
            offsets.push(position);
            position += transaction.notes.len() as u64;
        }

        let crypto = &*self.crypto;
        Ok(participants
            .par_iter()
            .map(|participant| {
                if !participant.account.should_decrypt(block.sequence) {
                    return None;
                }
                Some(
                    transactions
                        .iter()
                        .zip(&offsets)
                        .map(|(transaction, offset)| {
                            decrypt_transaction(
                                crypto,
                                &participant.account.view_key,
                                participant.spending_key.as_ref(),
                                transaction,
                                Some(*offset),
                            )
                        })
                        .collect(),
                )
            })
            .collect())
    }

    /// Resolve a creation block against this chain. Returns the creation
    /// position and the head to scan from, both `None` when the block is
    /// foreign.
    fn locate_created_at(
        &self,
        position: ChainPosition,
    ) -> Result<(Option<ChainPosition>, Option<ChainPosition>), WalletError> {
        match self.chain.header(&position.hash)? {
            Some(header) if header.sequence == position.sequence => {
                Ok((Some(position), header.previous_position()))
            }
            _ => {
                tracing::warn!(created_at = %position, "creation block not on this chain, scanning from genesis");
                Ok((None, None))
            }
        }
    }
}

/// Outputs of `transaction` that decrypt under `view_key`. Positions and
/// nullifiers are only known for transactions in a block.
fn decrypt_transaction(
    crypto: &dyn NoteCrypto,
    view_key: &ViewKey,
    spending_key: Option<&SpendingKey>,
    transaction: &Transaction,
    first_position: Option<u64>,
) -> Vec<DecryptedNote> {
    transaction
        .notes
        .iter()
        .enumerate()
        .filter_map(|(index, encrypted)| {
            let note = crypto.decrypt(encrypted, view_key)?;
            let position = first_position.map(|p| p + index as u64);
            let nullifier = match (spending_key, position) {
                (Some(key), Some(position)) => Some(crypto.compute_nullifier(&note, key, position)),
                _ => None,
            };
            Some(DecryptedNote {
                index,
                hash: encrypted.hash,
                note,
                position,
                nullifier,
            })
        })
        .collect()
}

fn validate_transaction(transaction: &Transaction) -> Result<(), WalletError> {
    if transaction.is_empty() {
        return Err(WalletError::InvalidTransaction(format!(
            "{} has no spends and no outputs",
            transaction.hash
        )));
    }
    let mut nullifiers = HashSet::new();
    if !transaction.spends.iter().all(|n| nullifiers.insert(*n)) {
        return Err(WalletError::InvalidTransaction(format!(
            "{} spends the same nullifier twice",
            transaction.hash
        )));
    }
    let mut notes = HashSet::new();
    if !transaction.notes.iter().all(|n| notes.insert(n.hash)) {
        return Err(WalletError::InvalidTransaction(format!(
            "{} repeats an output note",
            transaction.hash
        )));
    }
    Ok(())
}

fn read_head<R: ReadTxn + ?Sized>(
    txn: &R,
    id: &AccountId,
) -> Result<Option<ChainPosition>, WalletError> {
    Ok(get_record::<Option<ChainPosition>, _>(txn, Table::Heads, id.as_bytes())?.flatten())
}

fn write_head<W: WriteTxn + ?Sized>(
    txn: &mut W,
    id: &AccountId,
    head: Option<ChainPosition>,
) -> Result<(), WalletError> {
    Ok(put_record(txn, Table::Heads, id.as_bytes(), &head)?)
}

fn write_account<W: WriteTxn + ?Sized>(txn: &mut W, account: &Account) -> Result<(), WalletError> {
    Ok(put_record(txn, Table::Accounts, account.id.as_bytes(), account)?)
}

/// Drop an account's record and head and queue its ledger for cleanup.
fn retire_account<W: WriteTxn + ?Sized>(txn: &mut W, id: &AccountId) -> Result<(), WalletError> {
    txn.delete(Table::Accounts, id.as_bytes())?;
    txn.delete(Table::Heads, id.as_bytes())?;
    txn.put(Table::AccountsToDelete, id.as_bytes(), &[])?;
    Ok(())
}

/// A random id not used by a live or retired account.
fn fresh_account_id<R: ReadTxn + ?Sized>(
    registry: &AccountRegistry,
    txn: &R,
) -> Result<AccountId, WalletError> {
    loop {
        let id = AccountId::new(rand::random());
        if !registry.contains(&id) && !txn.contains(Table::AccountsToDelete, id.as_bytes())? {
            return Ok(id);
        }
    }
}
