//! Named tables of the wallet database.
//!
//! Per-account tables are keyed by `account_id ++ secondary key` so every
//! index of one account is a single prefix range.

/// A logical table. Backends map each one to a separate keyspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Database bookkeeping: schema version, follower position, encryption salt.
    Meta,
    /// `account_id` → account record.
    Accounts,
    /// `account_id` → optional head position.
    Heads,
    /// `account_id` → () for accounts awaiting physical deletion.
    AccountsToDelete,
    /// `account_id ++ tx_hash` → transaction record.
    Transactions,
    /// `account_id ++ sequence ++ tx_hash` → () for on-chain transactions.
    SequenceToTransaction,
    /// `account_id ++ expiration ++ tx_hash` → () for pending transactions.
    PendingTransactions,
    /// `account_id ++ note_hash` → note record.
    Notes,
    /// `account_id ++ sequence ++ note_hash` → () for on-chain notes.
    SequenceToNote,
    /// `account_id ++ note_hash` → () for off-chain notes.
    NonChainNotes,
    /// `account_id ++ asset_id ++ note_hash` → () for balance scans.
    AssetNotes,
    /// `account_id ++ nullifier` → note hash.
    NullifierToNote,
    /// `account_id ++ nullifier ++ tx_hash` → () for every known spender.
    NullifierSpenders,
}

impl Table {
    pub const ALL: [Table; 13] = [
        Table::Meta,
        Table::Accounts,
        Table::Heads,
        Table::AccountsToDelete,
        Table::Transactions,
        Table::SequenceToTransaction,
        Table::PendingTransactions,
        Table::Notes,
        Table::SequenceToNote,
        Table::NonChainNotes,
        Table::AssetNotes,
        Table::NullifierToNote,
        Table::NullifierSpenders,
    ];

    /// Tables holding data keyed by account prefix, wiped on account reset.
    pub const ACCOUNT_DATA: [Table; 9] = [
        Table::Transactions,
        Table::SequenceToTransaction,
        Table::PendingTransactions,
        Table::Notes,
        Table::SequenceToNote,
        Table::NonChainNotes,
        Table::AssetNotes,
        Table::NullifierToNote,
        Table::NullifierSpenders,
    ];

    /// Stable name used by backends for the underlying database.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Meta => "meta",
            Table::Accounts => "accounts",
            Table::Heads => "heads",
            Table::AccountsToDelete => "accounts_to_delete",
            Table::Transactions => "transactions",
            Table::SequenceToTransaction => "sequence_to_transaction",
            Table::PendingTransactions => "pending_transactions",
            Table::Notes => "notes",
            Table::SequenceToNote => "sequence_to_note",
            Table::NonChainNotes => "non_chain_notes",
            Table::AssetNotes => "asset_notes",
            Table::NullifierToNote => "nullifier_to_note",
            Table::NullifierSpenders => "nullifier_spenders",
        }
    }

    /// Position in [`Table::ALL`], usable as a dense array index.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), Table::ALL.len());
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, table) in Table::ALL.iter().enumerate() {
            assert_eq!(table.index(), i);
        }
    }

    #[test]
    fn account_data_excludes_global_tables() {
        assert!(!Table::ACCOUNT_DATA.contains(&Table::Meta));
        assert!(!Table::ACCOUNT_DATA.contains(&Table::Accounts));
        assert!(!Table::ACCOUNT_DATA.contains(&Table::Heads));
    }
}
