//! Transaction status derivation.
//!
//! Status is never stored. It is recomputed from the transaction record and
//! the account head on every read, so it can never drift from the ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use nyx_types::ChainPosition;

use crate::records::TransactionRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Unknown,
    Pending,
    Expired,
    Unconfirmed,
    Confirmed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Unknown => "unknown",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Unconfirmed => "unconfirmed",
            TransactionStatus::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}

/// A transaction with `expiration` can no longer be mined once the chain is
/// at `sequence`. Zero means it never expires.
pub fn is_expired_sequence(expiration: u32, sequence: u32) -> bool {
    expiration != 0 && expiration <= sequence
}

/// Derive the status of `record` for an account positioned at `head`.
///
/// `head_sequence` overrides the sequence used for confirmation depth and
/// expiry, e.g. to evaluate against the chain tip instead of the account head.
pub fn transaction_status(
    record: &TransactionRecord,
    head: Option<ChainPosition>,
    confirmations: u32,
    head_sequence: Option<u32>,
) -> TransactionStatus {
    let Some(head) = head else {
        return TransactionStatus::Unknown;
    };
    let sequence = head_sequence.unwrap_or(head.sequence);

    if let Some(tx_sequence) = record.sequence {
        return if sequence.saturating_sub(tx_sequence) >= confirmations {
            TransactionStatus::Confirmed
        } else {
            TransactionStatus::Unconfirmed
        };
    }

    if is_expired_sequence(record.expiration(), sequence) {
        TransactionStatus::Expired
    } else {
        TransactionStatus::Pending
    }
}
