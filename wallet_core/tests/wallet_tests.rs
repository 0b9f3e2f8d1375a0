//! Wallet scenarios run against the nullable chain, store, crypto, and
//! broadcaster: scanning across reorgs, transfers between accounts, pending
//! transaction upkeep, account lifecycle, and encryption at rest.

use std::sync::Arc;
use std::thread;

use nyx_chain::Chain;
use nyx_nullables::{NullBroadcaster, NullChain, NullCrypto, NullStore};
use nyx_store::Table;
use nyx_types::{AccountId, AssetId, BlockHash, ChainPosition, Nullifier, PublicAddress, SpendingKey};
use nyx_wallet_core::{
    Account, AccountImport, EncryptionStatus, KdfParams, NoteCrypto, TransactionStatus, Wallet,
    WalletConfig, WalletError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<NullStore>,
    chain: Arc<NullChain>,
    crypto: Arc<NullCrypto>,
    broadcaster: Arc<NullBroadcaster>,
    wallet: Wallet,
}

fn config() -> WalletConfig {
    WalletConfig {
        kdf: KdfParams {
            memory: 64,
            iterations: 1,
            parallelism: 1,
        },
        ..WalletConfig::default()
    }
}

fn harness() -> Harness {
    harness_with(config())
}

fn harness_with(config: WalletConfig) -> Harness {
    let store = Arc::new(NullStore::new());
    let chain = Arc::new(NullChain::new());
    let crypto = Arc::new(NullCrypto::new());
    let broadcaster = Arc::new(NullBroadcaster::new());
    let wallet = Wallet::open(
        store.clone(),
        chain.clone(),
        crypto.clone(),
        broadcaster.clone(),
        config,
    )
    .expect("open wallet");
    Harness {
        store,
        chain,
        crypto,
        broadcaster,
        wallet,
    }
}

impl Harness {
    fn reopen(&self) -> Wallet {
        Wallet::open(
            self.store.clone(),
            self.chain.clone(),
            self.crypto.clone(),
            self.broadcaster.clone(),
            config(),
        )
        .expect("reopen wallet")
    }

    fn confirmed(&self, account: &Account) -> u128 {
        self.wallet
            .get_balance(&account.id, AssetId::NATIVE, Some(0))
            .unwrap()
            .confirmed
    }

    fn tip(&self) -> ChainPosition {
        self.chain.head().unwrap().expect("chain has blocks").position()
    }

    fn head(&self, account: &Account) -> Option<ChainPosition> {
        self.wallet.account_head(&account.id).unwrap()
    }

    /// Mine a block paying `value` to `account` and scan it.
    fn fund(&self, account: &Account, value: u128) {
        self.chain
            .extend(vec![self.crypto.coinbase(account.address, value)]);
        self.wallet.scan().unwrap();
    }

    /// Nullifier of the account's only confirmed note.
    fn only_nullifier(&self, account: &Account) -> Nullifier {
        let notes = self
            .wallet
            .unspent_notes(&account.id, AssetId::NATIVE, Some(0))
            .unwrap();
        assert_eq!(notes.len(), 1);
        notes[0].nullifier.expect("spendable note has a nullifier")
    }
}

const STRANGER: PublicAddress = PublicAddress([0x5a; 32]);

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[test]
fn scan_on_empty_chain_is_complete() {
    let h = harness();
    h.wallet.create_account("alice", None).unwrap();
    let report = h.wallet.scan().unwrap();
    assert!(report.complete);
    assert_eq!(report.blocks_connected, 0);
    assert_eq!(report.head, None);
}

#[test]
fn scan_connects_received_notes() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.chain
        .extend(vec![h.crypto.coinbase(alice.address, 100)]);
    h.chain.extend_empty(2);

    let report = h.wallet.scan().unwrap();
    assert_eq!(report.blocks_connected, 3);
    assert_eq!(report.accounts_touched, 1);
    assert!(report.complete);

    let tip = h.tip();
    assert_eq!(h.head(&alice), Some(tip));
    assert_eq!(h.wallet.chain_position().unwrap(), Some(tip));
    assert_eq!(h.confirmed(&alice), 100);

    let again = h.wallet.scan().unwrap();
    assert!(again.complete);
    assert_eq!(again.blocks_connected, 0);
}

#[test]
fn scan_respects_block_cap_and_resumes() {
    let h = harness_with(WalletConfig {
        max_blocks_per_scan: 2,
        ..config()
    });
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.chain.extend_empty(5);

    let first = h.wallet.scan().unwrap();
    assert_eq!(first.blocks_connected, 2);
    assert!(!first.complete);
    assert_eq!(h.head(&alice).map(|p| p.sequence), Some(2));

    h.wallet.scan().unwrap();
    let last = h.wallet.scan().unwrap();
    assert!(last.complete);
    assert_eq!(h.head(&alice).map(|p| p.sequence), Some(5));
}

/// Coinbase V at block 1, T spending it in block 2, then a heavier fork
/// 1, 2', 3', 4' takes over.
fn reorg_scenario(expiration: u32) -> (Harness, Account, TransactionStatus) {
    let h = harness();
    let x = h.wallet.create_account("x", None).unwrap();
    let b1 = h.chain.extend(vec![h.crypto.coinbase(x.address, 100)]);
    h.wallet.scan().unwrap();

    let nullifier = h.only_nullifier(&x);
    let t = h.crypto.transaction(
        vec![nullifier],
        &[NullCrypto::note(STRANGER, 90)],
        10,
        expiration,
    );
    h.chain.extend(vec![t.clone()]);
    h.wallet.scan().unwrap();
    assert_eq!(h.confirmed(&x), 0);

    let b2 = h.chain.add_block(Some(&b1), vec![]);
    let b3 = h.chain.add_block(Some(&b2), vec![]);
    let b4 = h.chain.add_block(Some(&b3), vec![]);
    h.chain.set_head(&b4);

    let report = h.wallet.scan().unwrap();
    assert_eq!(report.blocks_disconnected, 1);
    assert_eq!(report.blocks_connected, 3);
    assert_eq!(h.head(&x), Some(b4.position()));

    let status = h.wallet.transaction_status(&x.id, &t.hash).unwrap();
    (h, x, status)
}

#[test]
fn reorg_restores_spent_note_and_leaves_spender_pending() {
    let (h, x, status) = reorg_scenario(0);
    assert_eq!(h.confirmed(&x), 100);
    assert_eq!(status, TransactionStatus::Pending);
    assert_eq!(h.wallet.pending_transactions(&x.id).unwrap().len(), 1);
}

#[test]
fn reorg_past_expiration_reports_expired() {
    let (h, x, status) = reorg_scenario(3);
    assert_eq!(h.confirmed(&x), 100);
    assert_eq!(status, TransactionStatus::Expired);
}

#[test]
fn transfer_moves_amount_plus_fee() {
    let h = harness();
    let a = h.wallet.create_account("a", None).unwrap();
    let b = h.wallet.create_account("b", None).unwrap();
    h.fund(&a, 100);
    assert_eq!((h.confirmed(&a), h.confirmed(&b)), (100, 0));

    let t = h.crypto.transaction(
        vec![h.only_nullifier(&a)],
        &[NullCrypto::note(b.address, 60)],
        40,
        0,
    );
    let added = h.wallet.submit_transaction(&t, true).unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(h.broadcaster.announced(), vec![t.hash]);

    let pending_b = h
        .wallet
        .get_balance(&b.id, AssetId::NATIVE, Some(0))
        .unwrap();
    assert_eq!(pending_b.pending, 60);
    assert_eq!(pending_b.pending_count, 1);

    h.chain.extend(vec![t.clone()]);
    h.wallet.scan().unwrap();
    assert_eq!(h.confirmed(&a), 0);
    assert_eq!(h.confirmed(&b), 60);
    assert_eq!(
        h.wallet.transaction_status(&a.id, &t.hash).unwrap(),
        TransactionStatus::Unconfirmed
    );

    h.chain.extend_empty(2);
    h.wallet.scan().unwrap();
    assert_eq!(
        h.wallet.transaction_status(&b.id, &t.hash).unwrap(),
        TransactionStatus::Confirmed
    );
}

#[test]
fn created_at_survives_unrelated_block() {
    let h = harness();
    let tip = h.chain.extend_empty(3).pop().unwrap();
    let alice = h.wallet.create_account("alice", None).unwrap();
    assert_eq!(alice.created_at, Some(tip.position()));
    assert_eq!(h.head(&alice), Some(tip.position()));

    let next = h.chain.extend(vec![h.crypto.coinbase(STRANGER, 5)]);
    h.wallet.scan().unwrap();

    let alice = h.wallet.account(&alice.id).unwrap();
    assert_eq!(alice.created_at, Some(tip.position()));
    assert_eq!(h.head(&alice), Some(next.position()));
}

#[test]
fn created_at_rolls_back_to_block_before_deepest_disconnect() {
    let h = harness();
    let a = h.chain.extend_empty(3);
    let x = h.wallet.create_account("x", None).unwrap();
    assert_eq!(x.created_at, Some(a[2].position()));

    let b2 = h.chain.add_block(Some(&a[0]), vec![]);
    let b3 = h.chain.add_block(Some(&b2), vec![]);
    let b4 = h.chain.add_block(Some(&b3), vec![]);
    h.chain.set_head(&b4);

    let report = h.wallet.scan().unwrap();
    assert_eq!(report.blocks_disconnected, 2);
    assert_eq!(report.blocks_connected, 3);
    let x = h.wallet.account(&x.id).unwrap();
    assert_eq!(x.created_at, Some(a[0].position()));
    assert_eq!(h.head(&x), Some(b4.position()));
}

#[test]
fn failed_commit_leaves_pre_block_state() {
    let h = harness();
    let a = h.wallet.create_account("a", None).unwrap();
    let b = h.wallet.create_account("b", None).unwrap();
    h.fund(&a, 100);
    let before = h.tip();

    h.chain.extend(vec![h.crypto.coinbase(b.address, 50)]);
    h.store.fail_next_commits(1);
    let err = h.wallet.scan().unwrap_err();
    assert!(matches!(err, WalletError::Store(_)), "got {err:?}");

    assert_eq!(h.head(&a), Some(before));
    assert_eq!(h.head(&b), Some(before));
    assert_eq!(h.wallet.chain_position().unwrap(), Some(before));
    assert_eq!(h.confirmed(&b), 0);

    let report = h.wallet.scan().unwrap();
    assert!(report.complete);
    assert_eq!(h.confirmed(&b), 50);
    assert_eq!(h.head(&a), h.head(&b));
}

#[test]
fn concurrent_scans_both_succeed() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.chain.extend_empty(20);
    let wallet = Arc::new(h.reopen());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let wallet = wallet.clone();
            thread::spawn(move || wallet.scan())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(
        wallet.account_head(&alice.id).unwrap().map(|p| p.sequence),
        Some(20)
    );
}

#[test]
fn disabled_account_is_not_scanned() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.wallet.set_scanning_enabled(&alice.id, false).unwrap();
    h.chain.extend_empty(3);

    let report = h.wallet.scan().unwrap();
    assert!(report.complete);
    assert_eq!(h.head(&alice), None);

    h.wallet.set_scanning_enabled(&alice.id, true).unwrap();
    h.wallet.scan().unwrap();
    assert_eq!(h.head(&alice).map(|p| p.sequence), Some(3));
}

#[test]
fn vanished_head_forces_rescan() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    let b1 = h.chain.extend(vec![h.crypto.coinbase(alice.address, 100)]);
    let b2 = h.chain.extend(vec![]);
    h.wallet.scan().unwrap();

    let b2b = h.chain.add_block(Some(&b1), vec![]);
    h.chain.set_head(&b2b);
    h.chain.forget(&b2.hash);

    let report = h.wallet.scan().unwrap();
    assert!(report.complete);
    assert_eq!(h.head(&alice), Some(b2b.position()));
    assert_eq!(h.confirmed(&alice), 100);
}

// ---------------------------------------------------------------------------
// Pending transactions
// ---------------------------------------------------------------------------

#[test]
fn expiration_sweep_and_delete() {
    let h = harness();
    let a = h.wallet.create_account("a", None).unwrap();
    h.fund(&a, 100);

    let t = h.crypto.transaction(
        vec![h.only_nullifier(&a)],
        &[NullCrypto::note(STRANGER, 100)],
        0,
        3,
    );
    h.wallet.submit_transaction(&t, false).unwrap();
    assert!(h.broadcaster.announced().is_empty());
    assert_eq!(
        h.wallet.transaction_status(&a.id, &t.hash).unwrap(),
        TransactionStatus::Pending
    );
    assert!(h
        .wallet
        .unspent_notes(&a.id, AssetId::NATIVE, Some(0))
        .unwrap()
        .is_empty());

    h.chain.extend_empty(2);
    h.wallet.scan().unwrap();
    assert_eq!(h.wallet.expire_transactions(2), 0);
    assert_eq!(h.wallet.expire_transactions(3), 1);
    assert_eq!(h.wallet.expire_transactions(3), 0);

    assert_eq!(
        h.wallet.transaction_status(&a.id, &t.hash).unwrap(),
        TransactionStatus::Expired
    );
    assert!(h.wallet.pending_transactions(&a.id).unwrap().is_empty());
    assert_eq!(
        h.wallet
            .unspent_notes(&a.id, AssetId::NATIVE, Some(0))
            .unwrap()
            .len(),
        1
    );

    h.wallet.delete_transaction(&a.id, &t.hash).unwrap();
    assert!(h.wallet.get_transaction(&a.id, &t.hash).unwrap().is_none());
    assert_eq!(
        h.wallet.transaction_status(&a.id, &t.hash).unwrap(),
        TransactionStatus::Unknown
    );
}

#[test]
fn zero_expiration_never_expires() {
    let h = harness();
    let a = h.wallet.create_account("a", None).unwrap();
    h.fund(&a, 100);
    let t = h.crypto.transaction(
        vec![h.only_nullifier(&a)],
        &[NullCrypto::note(STRANGER, 100)],
        0,
        0,
    );
    h.wallet.submit_transaction(&t, false).unwrap();

    assert_eq!(h.wallet.expire_transactions(u32::MAX), 0);
    h.chain.extend_empty(10);
    h.wallet.scan().unwrap();
    assert_eq!(
        h.wallet.transaction_status(&a.id, &t.hash).unwrap(),
        TransactionStatus::Pending
    );
}

#[test]
fn invalid_submission_changes_nothing() {
    let h = harness();
    let a = h.wallet.create_account("a", None).unwrap();
    h.fund(&a, 100);
    let nullifier = h.only_nullifier(&a);
    let t = h.crypto.transaction(vec![nullifier, nullifier], &[], 0, 0);
    assert!(matches!(
        h.wallet.submit_transaction(&t, true),
        Err(WalletError::InvalidTransaction(_))
    ));
    assert!(h.wallet.pending_transactions(&a.id).unwrap().is_empty());
    assert!(h.broadcaster.announced().is_empty());
}

#[test]
fn rebroadcast_paces_by_submitted_sequence() {
    let h = harness();
    let a = h.wallet.create_account("a", None).unwrap();
    h.fund(&a, 100);
    let t = h.crypto.transaction(
        vec![h.only_nullifier(&a)],
        &[NullCrypto::note(STRANGER, 100)],
        0,
        0,
    );
    h.wallet.submit_transaction(&t, true).unwrap();
    let submitted = |h: &Harness| {
        h.wallet
            .get_transaction(&a.id, &t.hash)
            .unwrap()
            .unwrap()
            .submitted_sequence
    };
    assert_eq!(submitted(&h), 1);

    assert_eq!(h.wallet.rebroadcast_transactions(11), 0);
    assert_eq!(h.broadcaster.announced().len(), 1);

    assert_eq!(h.wallet.rebroadcast_transactions(12), 1);
    assert_eq!(h.broadcaster.announced().len(), 2);
    assert_eq!(submitted(&h), 13);

    h.broadcaster.set_accepting(false);
    assert_eq!(h.wallet.rebroadcast_transactions(30), 0);
    assert_eq!(h.broadcaster.announced().len(), 3);
    assert_eq!(submitted(&h), 31);
}

// ---------------------------------------------------------------------------
// Account lifecycle
// ---------------------------------------------------------------------------

#[test]
fn duplicate_name_and_key_are_rejected() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    assert!(matches!(
        h.wallet.create_account("alice", None),
        Err(WalletError::DuplicateAccountName(_))
    ));

    let mut import =
        AccountImport::from_json(&h.wallet.export_account(&alice.id, true).unwrap()).unwrap();
    import.name = "alice-again".into();
    assert!(matches!(
        h.wallet.import_account(import),
        Err(WalletError::DuplicateAccountKey(_))
    ));
    assert_eq!(h.wallet.accounts().len(), 1);
}

#[test]
fn import_resolves_created_at_against_this_chain() {
    let h = harness();
    h.chain.extend_empty(2);
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.fund(&alice, 100);
    let exported = h.wallet.export_account(&alice.id, true).unwrap();
    h.wallet.remove_account(&alice.id).unwrap();

    let restored = h
        .wallet
        .import_account(AccountImport::from_json(&exported).unwrap())
        .unwrap();
    assert_ne!(restored.id, alice.id);
    assert_eq!(restored.created_at, alice.created_at);
    assert_eq!(h.head(&restored).map(|p| p.sequence), Some(1));
    assert!(!restored.is_view_only());

    h.wallet.scan().unwrap();
    assert_eq!(h.confirmed(&restored), 100);
}

#[test]
fn import_with_foreign_created_at_scans_from_genesis() {
    let h = harness();
    let blocks = h.chain.extend_empty(3);
    let keys = h.crypto.derive_keys(&SpendingKey([7; 32]));
    let import = AccountImport {
        version: 1,
        name: "imported".into(),
        spending_key: Some(hex::encode([7u8; 32])),
        view_key: hex::encode(keys.view_key.as_bytes()),
        address: hex::encode(keys.address.as_bytes()),
        created_at: Some(ChainPosition::new(BlockHash::new([0xee; 32]), 2)),
    };

    let account = h.wallet.import_account(import).unwrap();
    assert_eq!(account.created_at, None);
    assert_eq!(h.head(&account), None);

    h.wallet.scan().unwrap();
    assert_eq!(h.head(&account), Some(blocks[2].position()));
}

#[test]
fn import_without_created_at_starts_at_chain_head() {
    let h = harness();
    let blocks = h.chain.extend_empty(3);
    let keys = h.crypto.derive_keys(&SpendingKey([7; 32]));
    let import = AccountImport {
        version: 1,
        name: "imported".into(),
        spending_key: Some(hex::encode([7u8; 32])),
        view_key: hex::encode(keys.view_key.as_bytes()),
        address: hex::encode(keys.address.as_bytes()),
        created_at: None,
    };

    let account = h.wallet.import_account(import).unwrap();
    assert_eq!(account.created_at, Some(blocks[2].position()));
    assert_eq!(h.head(&account), Some(blocks[2].position()));

    let report = h.wallet.scan().unwrap();
    assert_eq!(report.blocks_connected, 0);
    assert!(report.complete);
}

#[test]
fn import_rejects_mismatched_spending_key() {
    let h = harness();
    let keys = h.crypto.derive_keys(&SpendingKey([7; 32]));
    let import = AccountImport {
        version: 1,
        name: "bad".into(),
        spending_key: Some(hex::encode([8u8; 32])),
        view_key: hex::encode(keys.view_key.as_bytes()),
        address: hex::encode(keys.address.as_bytes()),
        created_at: None,
    };
    assert!(matches!(
        h.wallet.import_account(import),
        Err(WalletError::InvalidImport(_))
    ));
}

#[test]
fn view_only_import_tracks_balance_without_nullifiers() {
    let h = harness();
    h.chain.extend_empty(1);
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.fund(&alice, 100);
    let exported = h.wallet.export_account(&alice.id, false).unwrap();
    h.wallet.remove_account(&alice.id).unwrap();

    let watcher = h
        .wallet
        .import_account(AccountImport::from_json(&exported).unwrap())
        .unwrap();
    assert!(watcher.is_view_only());
    h.wallet.scan().unwrap();
    assert_eq!(h.confirmed(&watcher), 100);
    let notes = h
        .wallet
        .unspent_notes(&watcher.id, AssetId::NATIVE, Some(0))
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].nullifier, None);
}

#[test]
fn reset_rescans_under_new_id_and_cleanup_purges_old_data() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.fund(&alice, 100);
    assert_eq!(h.store.len(Table::Notes), 1);

    let successor = h.wallet.reset_account(&alice.id, false, false).unwrap();
    assert_ne!(successor.id, alice.id);
    assert_eq!(successor.name, "alice");
    assert_eq!(successor.view_key, alice.view_key);
    assert!(h.wallet.account(&alice.id).is_none());
    assert!(matches!(
        h.wallet.get_balance(&alice.id, AssetId::NATIVE, None),
        Err(WalletError::AccountNotFound(_))
    ));
    assert_eq!(h.confirmed(&successor), 0);

    h.wallet.scan().unwrap();
    assert_eq!(h.confirmed(&successor), 100);
    assert_eq!(h.store.len(Table::Notes), 2);

    assert_eq!(h.wallet.cleanup_deleted_accounts(1).unwrap(), 1);
    assert_eq!(h.wallet.cleanup_deleted_accounts(1000).unwrap(), 5);
    assert_eq!(h.wallet.cleanup_deleted_accounts(1000).unwrap(), 0);
    assert_eq!(h.store.len(Table::Notes), 1);
    assert_eq!(h.store.len(Table::AccountsToDelete), 0);
}

#[test]
fn remove_and_rename() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    let bob = h.wallet.create_account("bob", None).unwrap();
    h.wallet.rename_account(&alice.id, "carol").unwrap();
    assert!(matches!(
        h.wallet.rename_account(&bob.id, "carol"),
        Err(WalletError::DuplicateAccountName(_))
    ));
    assert_eq!(h.wallet.account_by_name("carol").map(|a| a.id), Some(alice.id));

    h.wallet.remove_account(&bob.id).unwrap();
    let names: Vec<String> = h.wallet.accounts().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["carol".to_string()]);
    assert!(matches!(
        h.wallet.remove_account(&bob.id),
        Err(WalletError::AccountNotFound(_))
    ));

    let reopened = h.reopen();
    assert_eq!(reopened.account(&alice.id).map(|a| a.name), Some("carol".into()));
    assert!(reopened.account(&bob.id).is_none());
    assert!(reopened.account(&AccountId::new([0; 16])).is_none());
}

// ---------------------------------------------------------------------------
// Encryption at rest
// ---------------------------------------------------------------------------

#[test]
fn locked_wallet_rejects_key_operations() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    h.fund(&alice, 100);

    h.wallet.encrypt("correct horse").unwrap();
    assert_eq!(h.wallet.encryption_status(), EncryptionStatus::Unlocked);
    assert!(matches!(
        h.wallet.encrypt("again"),
        Err(WalletError::AlreadyEncrypted)
    ));
    h.wallet.lock().unwrap();
    assert_eq!(h.wallet.encryption_status(), EncryptionStatus::Locked);

    assert!(matches!(h.wallet.scan(), Err(WalletError::Locked)));
    assert!(matches!(
        h.wallet.create_account("bob", None),
        Err(WalletError::Locked)
    ));
    assert!(matches!(
        h.wallet.export_account(&alice.id, true),
        Err(WalletError::Locked)
    ));
    assert!(matches!(
        h.wallet.reset_account(&alice.id, false, false),
        Err(WalletError::Locked)
    ));
    assert!(h.wallet.export_account(&alice.id, false).is_ok());
    assert_eq!(h.confirmed(&alice), 100);

    assert!(matches!(
        h.wallet.unlock("wrong"),
        Err(WalletError::WrongPassphrase)
    ));
    h.wallet.unlock("correct horse").unwrap();
    h.chain.extend_empty(1);
    assert!(h.wallet.scan().unwrap().complete);
}

#[test]
fn encryption_persists_across_reopen_until_decrypted() {
    let h = harness();
    let alice = h.wallet.create_account("alice", None).unwrap();
    let plain_export = h.wallet.export_account(&alice.id, true).unwrap();

    h.wallet.encrypt("pw").unwrap();
    let bob = h.wallet.create_account("bob", None).unwrap();

    let reopened = h.reopen();
    assert_eq!(reopened.encryption_status(), EncryptionStatus::Locked);
    reopened.unlock("pw").unwrap();
    assert_eq!(reopened.export_account(&alice.id, true).unwrap(), plain_export);
    assert!(reopened.export_account(&bob.id, true).is_ok());

    reopened.decrypt("pw").unwrap();
    assert_eq!(reopened.encryption_status(), EncryptionStatus::Plaintext);
    assert!(matches!(reopened.lock(), Err(WalletError::NotEncrypted)));

    let again = h.reopen();
    assert_eq!(again.encryption_status(), EncryptionStatus::Plaintext);
    assert_eq!(again.export_account(&alice.id, true).unwrap(), plain_export);
}
