//! Transaction requests, receipts and the per-run submission journal.

use std::sync::{Arc, Mutex};

use alloy_core::primitives::{Address, Bytes, TxHash, TxKind, U256};
use serde::Serialize;

/// Inclusion state of a submitted transaction, as last observed on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Included,
    Failed,
}

/// Snapshot of a transaction's on-chain state.
///
/// Receipts are never advanced locally; a fresh one is fetched on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub status: TxStatus,
    /// Blocks observed from the inclusion block to the head, inclusive. Zero while pending.
    pub confirmations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Set by the node for contract creations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
}

impl TransactionReceipt {
    /// Receipt for a transaction that was just accepted by the node.
    pub fn pending(hash: TxHash) -> Self {
        Self {
            hash,
            status: TxStatus::Pending,
            confirmations: 0,
            block_number: None,
            contract_address: None,
        }
    }
}

/// An unsigned transaction, before nonce and fees are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: TxKind,
    pub input: Bytes,
    pub value: U256,
}

impl TransactionRequest {
    pub fn call(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            to: TxKind::Call(to),
            input: input.into(),
            value: U256::ZERO,
        }
    }

    pub fn create(init_code: impl Into<Bytes>) -> Self {
        Self {
            to: TxKind::Create,
            input: init_code.into(),
            value: U256::ZERO,
        }
    }
}

/// A submitted transaction, kept so an interrupted run can report what it sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub hash: TxHash,
    pub label: String,
}

/// Hashes of every transaction submitted during one run.
///
/// Cloning shares the underlying list.
#[derive(Debug, Clone, Default)]
pub struct TxJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl TxJournal {
    pub fn record(&self, hash: TxHash, label: impl Into<String>) {
        let label = label.into();
        tracing::info!(tx_hash = %hash, label = %label, "Broadcasting transaction");
        // A poisoned lock still holds valid entries.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(JournalEntry { hash, label });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_clones_share_entries() {
        let journal = TxJournal::default();
        let handle = journal.clone();
        assert!(journal.is_empty());

        handle.record(TxHash::repeat_byte(1), "deploy");
        handle.record(TxHash::repeat_byte(2), "addAdmin");

        let entries = journal.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "deploy");
        assert_eq!(entries[1].hash, TxHash::repeat_byte(2));
    }

    #[test]
    fn test_pending_receipt() {
        let receipt = TransactionReceipt::pending(TxHash::ZERO);
        assert_eq!(receipt.status, TxStatus::Pending);
        assert_eq!(receipt.confirmations, 0);
        assert_eq!(receipt.status.to_string(), "pending");
    }
}
