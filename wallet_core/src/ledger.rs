//! Per-account note, nullifier, and transaction indices.
//!
//! Every key is prefixed with the 16-byte account id, so one account's data
//! is a contiguous range in each table and can be scanned or wiped with a
//! single prefix. Sequences and expirations are big-endian so range scans
//! come back in numeric order.
//!
//! | table                   | key                        | value              |
//! |-------------------------|----------------------------|--------------------|
//! | `Transactions`          | account ++ tx              | `TransactionRecord`|
//! | `SequenceToTransaction` | account ++ seq ++ tx       | empty              |
//! | `PendingTransactions`   | account ++ expiration ++ tx| empty              |
//! | `Notes`                 | account ++ note            | `NoteRecord`       |
//! | `SequenceToNote`        | account ++ seq ++ note     | empty              |
//! | `NonChainNotes`         | account ++ note            | empty              |
//! | `AssetNotes`            | account ++ asset ++ note   | empty              |
//! | `NullifierToNote`       | account ++ nullifier       | note hash          |
//! | `NullifierSpenders`     | account ++ nullifier ++ tx | empty              |
//!
//! Mutations take a [`WriteTxn`] so the caller can commit them together with
//! the account head. Balances are computed from the indices on every call.

use std::collections::{BTreeSet, HashSet};

use nyx_store::key::{read_32, read_u32};
use nyx_store::{get_record, put_record, KeyBuilder, ReadTxn, StoreError, Table, WriteTxn};
use nyx_types::{
    AccountId, AssetId, BlockHeader, ChainPosition, NoteHash, Nullifier, Timestamp, Transaction,
    TxHash,
};

use crate::lifecycle::is_expired_sequence;
use crate::records::{AssetBalance, DecryptedNote, NoteRecord, TransactionRecord};
use crate::WalletError;

const ACCOUNT_LEN: usize = AccountId::LEN;
const HASH_LEN: usize = 32;
const SEQ_LEN: usize = 4;

/// Handle on one account's slice of the ledger tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountLedger {
    id: AccountId,
}

impl AccountLedger {
    pub fn new(id: AccountId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    // --- keys ---

    fn prefix(&self) -> Vec<u8> {
        KeyBuilder::account(&self.id).build()
    }

    fn tx_key(&self, hash: &TxHash) -> Vec<u8> {
        KeyBuilder::account(&self.id).bytes(hash.as_bytes()).build()
    }

    fn sequence_tx_key(&self, sequence: u32, hash: &TxHash) -> Vec<u8> {
        KeyBuilder::account(&self.id)
            .u32(sequence)
            .bytes(hash.as_bytes())
            .build()
    }

    fn pending_key(&self, expiration: u32, hash: &TxHash) -> Vec<u8> {
        KeyBuilder::account(&self.id)
            .u32(expiration)
            .bytes(hash.as_bytes())
            .build()
    }

    fn note_key(&self, hash: &NoteHash) -> Vec<u8> {
        KeyBuilder::account(&self.id).bytes(hash.as_bytes()).build()
    }

    fn sequence_note_key(&self, sequence: u32, hash: &NoteHash) -> Vec<u8> {
        KeyBuilder::account(&self.id)
            .u32(sequence)
            .bytes(hash.as_bytes())
            .build()
    }

    fn asset_prefix(&self, asset: &AssetId) -> Vec<u8> {
        KeyBuilder::account(&self.id).bytes(asset.as_bytes()).build()
    }

    fn asset_note_key(&self, asset: &AssetId, note: &NoteHash) -> Vec<u8> {
        KeyBuilder::account(&self.id)
            .bytes(asset.as_bytes())
            .bytes(note.as_bytes())
            .build()
    }

    fn nullifier_key(&self, nullifier: &Nullifier) -> Vec<u8> {
        KeyBuilder::account(&self.id).bytes(nullifier.as_bytes()).build()
    }

    fn spender_key(&self, nullifier: &Nullifier, tx: &TxHash) -> Vec<u8> {
        KeyBuilder::account(&self.id)
            .bytes(nullifier.as_bytes())
            .bytes(tx.as_bytes())
            .build()
    }

    // --- point reads ---

    pub fn get_transaction<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        hash: &TxHash,
    ) -> Result<Option<TransactionRecord>, WalletError> {
        Ok(get_record(txn, Table::Transactions, &self.tx_key(hash))?)
    }

    pub fn get_note<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        hash: &NoteHash,
    ) -> Result<Option<NoteRecord>, WalletError> {
        Ok(get_record(txn, Table::Notes, &self.note_key(hash))?)
    }

    pub fn note_for_nullifier<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        nullifier: &Nullifier,
    ) -> Result<Option<NoteHash>, WalletError> {
        txn.get(Table::NullifierToNote, &self.nullifier_key(nullifier))?
            .map(|bytes| {
                NoteHash::from_slice(&bytes)
                    .map_err(|e| WalletError::from(StoreError::Corruption(e.to_string())))
            })
            .transpose()
    }

    /// Transactions recorded as spending `nullifier`, on chain or pending.
    pub fn spenders<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        nullifier: &Nullifier,
    ) -> Result<Vec<TxHash>, WalletError> {
        txn.scan_prefix(Table::NullifierSpenders, &self.nullifier_key(nullifier))?
            .iter()
            .map(|(key, _)| hash_at(key, ACCOUNT_LEN + HASH_LEN).map(TxHash::new))
            .collect()
    }

    // --- listings ---

    /// Every transaction of the account, keyed order.
    pub fn transactions<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        txn.scan_prefix(Table::Transactions, &self.prefix())?
            .iter()
            .map(|(_, value)| nyx_store::decode(value).map_err(WalletError::from))
            .collect()
    }

    /// On-chain transactions in ascending sequence order.
    pub fn transactions_by_sequence<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        let entries = txn.scan_prefix(Table::SequenceToTransaction, &self.prefix())?;
        self.load_indexed(txn, &entries)
    }

    /// Transactions still in the pending index, ordered by expiration.
    pub fn pending_transactions<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        let entries = txn.scan_prefix(Table::PendingTransactions, &self.prefix())?;
        self.load_indexed(txn, &entries)
    }

    pub fn notes<R: ReadTxn + ?Sized>(&self, txn: &R) -> Result<Vec<NoteRecord>, WalletError> {
        txn.scan_prefix(Table::Notes, &self.prefix())?
            .iter()
            .map(|(_, value)| nyx_store::decode(value).map_err(WalletError::from))
            .collect()
    }

    /// Hashes of notes held off chain (outputs of transactions not yet mined).
    pub fn non_chain_notes<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
    ) -> Result<Vec<NoteHash>, WalletError> {
        txn.scan_prefix(Table::NonChainNotes, &self.prefix())?
            .iter()
            .map(|(key, _)| hash_at(key, ACCOUNT_LEN).map(NoteHash::new))
            .collect()
    }

    /// Hashes of on-chain notes in ascending sequence order.
    pub fn chain_notes<R: ReadTxn + ?Sized>(&self, txn: &R) -> Result<Vec<NoteHash>, WalletError> {
        txn.scan_prefix(Table::SequenceToNote, &self.prefix())?
            .iter()
            .map(|(key, _)| hash_at(key, ACCOUNT_LEN + SEQ_LEN).map(NoteHash::new))
            .collect()
    }

    /// Assets for which the account holds at least one note.
    pub fn assets<R: ReadTxn + ?Sized>(&self, txn: &R) -> Result<BTreeSet<AssetId>, WalletError> {
        txn.scan_prefix(Table::AssetNotes, &self.prefix())?
            .iter()
            .map(|(key, _)| hash_at(key, ACCOUNT_LEN).map(AssetId::new))
            .collect()
    }

    fn load_indexed<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        entries: &[nyx_store::KvPair],
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        let mut records = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            let hash = TxHash::new(hash_at(key, ACCOUNT_LEN + SEQ_LEN)?);
            let record = self.get_transaction(txn, &hash)?.ok_or_else(|| {
                StoreError::Corruption(format!("index references missing transaction {hash}"))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Pending transactions that have not expired at `head_sequence`.
    fn live_pending<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        head_sequence: u32,
    ) -> Result<HashSet<TxHash>, WalletError> {
        let mut live = HashSet::new();
        for (key, _) in txn.scan_prefix(Table::PendingTransactions, &self.prefix())? {
            let expiration = read_u32(&key, ACCOUNT_LEN).ok_or_else(|| corrupt_key(&key))?;
            if !is_expired_sequence(expiration, head_sequence) {
                live.insert(TxHash::new(hash_at(&key, ACCOUNT_LEN + SEQ_LEN)?));
            }
        }
        Ok(live)
    }

    fn notes_for_asset<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        asset: &AssetId,
    ) -> Result<Vec<NoteRecord>, WalletError> {
        let mut notes = Vec::new();
        for (key, _) in txn.scan_prefix(Table::AssetNotes, &self.asset_prefix(asset))? {
            let hash = NoteHash::new(hash_at(&key, ACCOUNT_LEN + HASH_LEN)?);
            if let Some(note) = self.get_note(txn, &hash)? {
                notes.push(note);
            }
        }
        Ok(notes)
    }

    /// How a note is spent: the lowest sequence of an on-chain spender, and
    /// whether a live pending transaction consumes it.
    fn spend_state<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        note: &NoteRecord,
        live_pending: &HashSet<TxHash>,
    ) -> Result<SpendState, WalletError> {
        let mut state = SpendState::default();
        let Some(nullifier) = note.nullifier else {
            return Ok(state);
        };
        for spender in self.spenders(txn, &nullifier)? {
            if live_pending.contains(&spender) {
                state.pending = true;
                continue;
            }
            if let Some(sequence) = self
                .get_transaction(txn, &spender)?
                .and_then(|record| record.sequence)
            {
                state.chain_sequence = Some(state.chain_sequence.map_or(sequence, |s| s.min(sequence)));
            }
        }
        Ok(state)
    }

    fn spent_on_chain_except<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        nullifier: &Nullifier,
        except: &TxHash,
    ) -> Result<bool, WalletError> {
        for spender in self.spenders(txn, nullifier)? {
            if spender == *except {
                continue;
            }
            if self
                .get_transaction(txn, &spender)?
                .is_some_and(|record| record.is_on_chain())
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matched_spends<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        transaction: &Transaction,
    ) -> Result<Vec<(Nullifier, NoteHash)>, WalletError> {
        let mut matched = Vec::new();
        for nullifier in &transaction.spends {
            if let Some(note) = self.note_for_nullifier(txn, nullifier)? {
                matched.push((*nullifier, note));
            }
        }
        Ok(matched)
    }

    // --- balances ---

    /// Balance of `asset` as seen from `head`.
    pub fn get_balance<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        head: Option<ChainPosition>,
        asset: AssetId,
        confirmations: u32,
    ) -> Result<AssetBalance, WalletError> {
        let head_sequence = head.map_or(0, |h| h.sequence);
        let depth = head_sequence.saturating_sub(confirmations);
        let live_pending = self.live_pending(txn, head_sequence)?;

        let mut balance = AssetBalance {
            asset_id: asset,
            head,
            ..AssetBalance::default()
        };

        for note in self.notes_for_asset(txn, &asset)? {
            let value = note.value();
            let Some(sequence) = note.sequence else {
                if live_pending.contains(&note.transaction)
                    && !self.spend_state(txn, &note, &live_pending)?.pending
                {
                    balance.pending = checked_add(balance.pending, value)?;
                }
                continue;
            };

            let spend = self.spend_state(txn, &note, &live_pending)?;
            if spend.chain_sequence.is_none() {
                balance.unconfirmed = checked_add(balance.unconfirmed, value)?;
                if !spend.pending {
                    balance.pending = checked_add(balance.pending, value)?;
                }
            }
            if sequence <= depth && spend.chain_sequence.map_or(true, |s| s > depth) {
                balance.confirmed = checked_add(balance.confirmed, value)?;
                if spend.is_unspent() {
                    balance.available_notes += 1;
                }
            }
        }

        if head.is_some() {
            balance.unconfirmed_count = self.count_transactions_between(txn, depth, head_sequence)?;
        }
        balance.pending_count = live_pending.len() as u32;
        Ok(balance)
    }

    /// Balances for every asset the account holds, plus the native asset.
    pub fn get_balances<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        head: Option<ChainPosition>,
        confirmations: u32,
    ) -> Result<Vec<AssetBalance>, WalletError> {
        let mut assets = self.assets(txn)?;
        assets.insert(AssetId::NATIVE);
        assets
            .into_iter()
            .map(|asset| self.get_balance(txn, head, asset, confirmations))
            .collect()
    }

    /// Confirmed notes that no transaction, on chain or pending, spends.
    pub fn unspent_notes<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        head: Option<ChainPosition>,
        asset: AssetId,
        confirmations: u32,
    ) -> Result<Vec<NoteRecord>, WalletError> {
        let head_sequence = head.map_or(0, |h| h.sequence);
        let depth = head_sequence.saturating_sub(confirmations);
        let live_pending = self.live_pending(txn, head_sequence)?;

        let mut unspent = Vec::new();
        for note in self.notes_for_asset(txn, &asset)? {
            if !note.sequence.is_some_and(|s| s <= depth) {
                continue;
            }
            if self.spend_state(txn, &note, &live_pending)?.is_unspent() {
                unspent.push(note);
            }
        }
        Ok(unspent)
    }

    /// Transactions with `after < sequence <= through`.
    fn count_transactions_between<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        after: u32,
        through: u32,
    ) -> Result<u32, WalletError> {
        if through <= after {
            return Ok(0);
        }
        let start = KeyBuilder::account(&self.id).u32(after + 1).build();
        let entries = match through.checked_add(1) {
            Some(end) => {
                let end = KeyBuilder::account(&self.id).u32(end).build();
                txn.scan_range(Table::SequenceToTransaction, &start, Some(&end))?
            }
            None => {
                let end = nyx_store::prefix_upper_bound(&self.prefix());
                txn.scan_range(Table::SequenceToTransaction, &start, end.as_deref())?
            }
        };
        Ok(entries.len() as u32)
    }

    // --- mutations ---

    /// Record `transaction` as included in `block`.
    ///
    /// `notes` are the outputs that decrypted for this account, with their
    /// tree positions and (if spendable) nullifiers. Returns whether the
    /// transaction is relevant to the account; irrelevant transactions are not
    /// stored. Connecting a transaction already connected at `block` is a
    /// no-op.
    pub fn connect_transaction<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        block: &BlockHeader,
        transaction: &Transaction,
        notes: &[DecryptedNote],
    ) -> Result<bool, WalletError> {
        let existing = self.get_transaction(&*txn, &transaction.hash)?;
        if let Some(record) = &existing {
            if record.block_hash == Some(block.hash) {
                return Ok(false);
            }
            if record.is_on_chain() {
                return Err(WalletError::InvalidBlock(format!(
                    "transaction {} is already on chain at sequence {:?}",
                    transaction.hash, record.sequence
                )));
            }
        }

        let matched = self.matched_spends(&*txn, transaction)?;
        if existing.is_none() && notes.is_empty() && matched.is_empty() {
            return Ok(false);
        }

        for decrypted in notes {
            let note_key = self.note_key(&decrypted.hash);
            txn.delete(Table::NonChainNotes, &note_key)?;
            let stale = self
                .get_note(&*txn, &decrypted.hash)?
                .and_then(|previous| previous.nullifier)
                .filter(|previous| Some(*previous) != decrypted.nullifier);
            if let Some(stale) = stale {
                txn.delete(Table::NullifierToNote, &self.nullifier_key(&stale))?;
            }

            let record = NoteRecord {
                hash: decrypted.hash,
                note: decrypted.note.clone(),
                transaction: transaction.hash,
                position: decrypted.position,
                nullifier: decrypted.nullifier,
                sequence: Some(block.sequence),
                block_hash: Some(block.hash),
                spent: false,
            };
            put_record(txn, Table::Notes, &note_key, &record)?;
            txn.put(
                Table::SequenceToNote,
                &self.sequence_note_key(block.sequence, &decrypted.hash),
                &[],
            )?;
            txn.put(
                Table::AssetNotes,
                &self.asset_note_key(&record.asset_id(), &decrypted.hash),
                &[],
            )?;
            if let Some(nullifier) = decrypted.nullifier {
                txn.put(
                    Table::NullifierToNote,
                    &self.nullifier_key(&nullifier),
                    decrypted.hash.as_bytes(),
                )?;
            }
        }

        for (nullifier, note_hash) in &matched {
            txn.put(
                Table::NullifierSpenders,
                &self.spender_key(nullifier, &transaction.hash),
                &[],
            )?;
            if let Some(mut note) = self.get_note(&*txn, note_hash)? {
                if !note.spent {
                    note.spent = true;
                    put_record(txn, Table::Notes, &self.note_key(note_hash), &note)?;
                }
            }
        }

        let record = match existing {
            Some(mut record) => {
                txn.delete(
                    Table::PendingTransactions,
                    &self.pending_key(record.expiration(), &record.hash()),
                )?;
                record.block_hash = Some(block.hash);
                record.sequence = Some(block.sequence);
                record
            }
            None => TransactionRecord {
                transaction: transaction.clone(),
                block_hash: Some(block.hash),
                sequence: Some(block.sequence),
                submitted_sequence: block.sequence,
                timestamp: block.timestamp,
            },
        };
        put_record(txn, Table::Transactions, &self.tx_key(&transaction.hash), &record)?;
        txn.put(
            Table::SequenceToTransaction,
            &self.sequence_tx_key(block.sequence, &transaction.hash),
            &[],
        )?;

        tracing::trace!(
            account = %self.id,
            tx = %transaction.hash,
            sequence = block.sequence,
            notes = notes.len(),
            spends = matched.len(),
            "connected transaction"
        );
        Ok(true)
    }

    /// Undo [`connect_transaction`](Self::connect_transaction) for `block`.
    ///
    /// Outputs move back off chain and lose their position. An output that
    /// another recorded transaction spends keeps its nullifier, so the spend
    /// still nets out of the pending balance; otherwise the nullifier is
    /// dropped too. Notes this transaction spent become unspent unless another on-chain
    /// transaction also spends them. The transaction returns to the pending
    /// index unless it has expired relative to the block's parent; miner's fee
    /// transactions can never be mined again and are removed.
    pub fn disconnect_transaction<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        block: &BlockHeader,
        transaction: &Transaction,
    ) -> Result<bool, WalletError> {
        let Some(mut record) = self.get_transaction(&*txn, &transaction.hash)? else {
            return Ok(false);
        };
        if record.block_hash != Some(block.hash) {
            return Ok(false);
        }

        for encrypted in &transaction.notes {
            let Some(mut note) = self.get_note(&*txn, &encrypted.hash)? else {
                continue;
            };
            if note.transaction != transaction.hash {
                continue;
            }
            let note_key = self.note_key(&note.hash);
            if let Some(sequence) = note.sequence {
                txn.delete(Table::SequenceToNote, &self.sequence_note_key(sequence, &note.hash))?;
            }
            if let Some(nullifier) = note.nullifier {
                if self.spenders(&*txn, &nullifier)?.is_empty() {
                    txn.delete(Table::NullifierToNote, &self.nullifier_key(&nullifier))?;
                    note.nullifier = None;
                }
            }
            txn.put(Table::NonChainNotes, &note_key, &[])?;

            note.sequence = None;
            note.block_hash = None;
            note.position = None;
            note.spent = false;
            put_record(txn, Table::Notes, &note_key, &note)?;
        }

        let head_sequence = block.sequence.saturating_sub(1);
        let expired = is_expired_sequence(transaction.expiration, head_sequence);

        for nullifier in &transaction.spends {
            let spender_key = self.spender_key(nullifier, &transaction.hash);
            if !txn.contains(Table::NullifierSpenders, &spender_key)? {
                continue;
            }
            if expired {
                txn.delete(Table::NullifierSpenders, &spender_key)?;
            }
            let Some(note_hash) = self.note_for_nullifier(&*txn, nullifier)? else {
                continue;
            };
            if let Some(mut note) = self.get_note(&*txn, &note_hash)? {
                let still_spent = self.spent_on_chain_except(&*txn, nullifier, &transaction.hash)?;
                if note.spent != still_spent {
                    note.spent = still_spent;
                    put_record(txn, Table::Notes, &self.note_key(&note_hash), &note)?;
                }
            }
        }

        if let Some(sequence) = record.sequence {
            txn.delete(
                Table::SequenceToTransaction,
                &self.sequence_tx_key(sequence, &transaction.hash),
            )?;
        }
        record.block_hash = None;
        record.sequence = None;

        if transaction.is_miners_fee() {
            self.remove_transaction(txn, &record)?;
        } else {
            put_record(txn, Table::Transactions, &self.tx_key(&transaction.hash), &record)?;
            if !expired {
                txn.put(
                    Table::PendingTransactions,
                    &self.pending_key(record.expiration(), &record.hash()),
                    &[],
                )?;
            }
        }

        tracing::trace!(
            account = %self.id,
            tx = %transaction.hash,
            sequence = block.sequence,
            expired,
            "disconnected transaction"
        );
        Ok(true)
    }

    /// Record a locally submitted transaction. Idempotent by hash; returns
    /// whether anything was stored.
    pub fn add_pending_transaction<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        transaction: &Transaction,
        notes: &[DecryptedNote],
        submitted_sequence: u32,
    ) -> Result<bool, WalletError> {
        if self.get_transaction(&*txn, &transaction.hash)?.is_some() {
            return Ok(false);
        }
        let matched = self.matched_spends(&*txn, transaction)?;
        if notes.is_empty() && matched.is_empty() {
            return Ok(false);
        }

        for decrypted in notes {
            let note_key = self.note_key(&decrypted.hash);
            let record = NoteRecord {
                hash: decrypted.hash,
                note: decrypted.note.clone(),
                transaction: transaction.hash,
                position: None,
                nullifier: None,
                sequence: None,
                block_hash: None,
                spent: false,
            };
            put_record(txn, Table::Notes, &note_key, &record)?;
            txn.put(Table::NonChainNotes, &note_key, &[])?;
            txn.put(
                Table::AssetNotes,
                &self.asset_note_key(&record.asset_id(), &decrypted.hash),
                &[],
            )?;
        }

        for (nullifier, _) in &matched {
            txn.put(
                Table::NullifierSpenders,
                &self.spender_key(nullifier, &transaction.hash),
                &[],
            )?;
        }

        let record = TransactionRecord {
            transaction: transaction.clone(),
            block_hash: None,
            sequence: None,
            submitted_sequence,
            timestamp: Timestamp::now(),
        };
        put_record(txn, Table::Transactions, &self.tx_key(&transaction.hash), &record)?;
        txn.put(
            Table::PendingTransactions,
            &self.pending_key(transaction.expiration, &transaction.hash),
            &[],
        )?;
        Ok(true)
    }

    /// Drop an unmined transaction whose expiration has been reached. The
    /// record is kept so its status reads as expired.
    ///
    /// Allowed when the expiration is non-zero and at most one past
    /// `head_sequence` (the next block can no longer include it). Returns
    /// whether the transaction was expired by this call.
    pub fn expire_transaction<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        hash: &TxHash,
        head_sequence: u32,
    ) -> Result<bool, WalletError> {
        let record = self
            .get_transaction(&*txn, hash)?
            .ok_or(WalletError::TransactionNotFound(*hash))?;
        let expiration = record.expiration();
        if record.is_on_chain() || expiration == 0 || expiration > head_sequence.saturating_add(1) {
            return Ok(false);
        }
        if !txn.delete(Table::PendingTransactions, &self.pending_key(expiration, hash))? {
            return Ok(false);
        }
        for nullifier in &record.transaction.spends {
            txn.delete(Table::NullifierSpenders, &self.spender_key(nullifier, hash))?;
        }
        tracing::debug!(account = %self.id, tx = %hash, expiration, "expired transaction");
        Ok(true)
    }

    /// Remove a transaction the chain will never include. Allowed for expired
    /// transactions and for pending ones whose outputs nothing spends.
    pub fn delete_transaction<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        hash: &TxHash,
        head_sequence: u32,
    ) -> Result<(), WalletError> {
        let record = self
            .get_transaction(&*txn, hash)?
            .ok_or(WalletError::TransactionNotFound(*hash))?;
        if record.is_on_chain() {
            return Err(WalletError::TransactionNotDeletable(*hash));
        }
        let in_pending_index = txn.contains(
            Table::PendingTransactions,
            &self.pending_key(record.expiration(), hash),
        )?;
        let expired = !in_pending_index || is_expired_sequence(record.expiration(), head_sequence);
        if !expired && self.outputs_spent(&*txn, &record)? {
            return Err(WalletError::TransactionNotDeletable(*hash));
        }
        self.remove_transaction(txn, &record)
    }

    fn outputs_spent<R: ReadTxn + ?Sized>(
        &self,
        txn: &R,
        record: &TransactionRecord,
    ) -> Result<bool, WalletError> {
        for encrypted in &record.transaction.notes {
            let Some(note) = self.get_note(txn, &encrypted.hash)? else {
                continue;
            };
            if note.transaction != record.hash() {
                continue;
            }
            if note.spent {
                return Ok(true);
            }
            if let Some(nullifier) = note.nullifier {
                if !self.spenders(txn, &nullifier)?.is_empty() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn remove_transaction<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        record: &TransactionRecord,
    ) -> Result<(), WalletError> {
        let hash = record.hash();
        for encrypted in &record.transaction.notes {
            let Some(note) = self.get_note(&*txn, &encrypted.hash)? else {
                continue;
            };
            if note.transaction != hash {
                continue;
            }
            let note_key = self.note_key(&note.hash);
            txn.delete(Table::Notes, &note_key)?;
            txn.delete(Table::NonChainNotes, &note_key)?;
            txn.delete(
                Table::AssetNotes,
                &self.asset_note_key(&note.asset_id(), &note.hash),
            )?;
            if let Some(sequence) = note.sequence {
                txn.delete(Table::SequenceToNote, &self.sequence_note_key(sequence, &note.hash))?;
            }
            if let Some(nullifier) = note.nullifier {
                txn.delete(Table::NullifierToNote, &self.nullifier_key(&nullifier))?;
                txn.delete_prefix(Table::NullifierSpenders, &self.nullifier_key(&nullifier))?;
            }
        }
        for nullifier in &record.transaction.spends {
            txn.delete(Table::NullifierSpenders, &self.spender_key(nullifier, &hash))?;
        }
        txn.delete(
            Table::PendingTransactions,
            &self.pending_key(record.expiration(), &hash),
        )?;
        if let Some(sequence) = record.sequence {
            txn.delete(Table::SequenceToTransaction, &self.sequence_tx_key(sequence, &hash))?;
        }
        txn.delete(Table::Transactions, &self.tx_key(&hash))?;
        tracing::debug!(account = %self.id, tx = %hash, "deleted transaction");
        Ok(())
    }

    pub fn update_submitted_sequence<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        hash: &TxHash,
        submitted_sequence: u32,
    ) -> Result<(), WalletError> {
        let mut record = self
            .get_transaction(&*txn, hash)?
            .ok_or(WalletError::TransactionNotFound(*hash))?;
        record.submitted_sequence = submitted_sequence;
        put_record(txn, Table::Transactions, &self.tx_key(hash), &record)?;
        Ok(())
    }

    /// Wipe every index entry of the account. Returns the number of entries
    /// removed.
    pub fn clear<W: WriteTxn + ?Sized>(&self, txn: &mut W) -> Result<u64, WalletError> {
        let prefix = self.prefix();
        let mut removed = 0;
        for table in Table::ACCOUNT_DATA {
            removed += txn.delete_prefix(table, &prefix)?;
        }
        Ok(removed)
    }

    /// Like [`clear`](Self::clear) but removes at most `limit` entries.
    /// Returns the number removed and whether the account has no data left.
    pub fn clear_limited<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        limit: usize,
    ) -> Result<(usize, bool), WalletError> {
        let prefix = self.prefix();
        let mut removed = 0;
        for table in Table::ACCOUNT_DATA {
            for (key, _) in txn.scan_prefix(table, &prefix)? {
                if removed == limit {
                    return Ok((removed, false));
                }
                txn.delete(table, &key)?;
                removed += 1;
            }
        }
        Ok((removed, true))
    }
}

#[derive(Debug, Default)]
struct SpendState {
    chain_sequence: Option<u32>,
    pending: bool,
}

impl SpendState {
    fn is_unspent(&self) -> bool {
        self.chain_sequence.is_none() && !self.pending
    }
}

fn checked_add(a: u128, b: u128) -> Result<u128, WalletError> {
    a.checked_add(b).ok_or(WalletError::Overflow)
}

fn hash_at(key: &[u8], offset: usize) -> Result<[u8; 32], WalletError> {
    read_32(key, offset).ok_or_else(|| corrupt_key(key))
}

fn corrupt_key(key: &[u8]) -> WalletError {
    StoreError::Corruption(format!("malformed index key {}", hex::encode(key))).into()
}
