//! TransactionLog port

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entry::{LedgerEntry, TransactionId};
use crate::transfer::TransferReceipt;
use crate::wallet::AccountId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Soft failure: the write may be retried later
    #[error("Ledger write failed: {0}")]
    WriteFailed(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Idempotency key: client reference scoped to the sending account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub sender: AccountId,
    pub reference: String,
}

impl IdempotencyKey {
    pub fn new(sender: AccountId, reference: impl Into<String>) -> Self {
        Self {
            sender,
            reference: reference.into(),
        }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sender, self.reference)
    }
}

/// Result of trying to claim a client reference
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceClaim {
    /// Fresh claim; the caller owns the reference until it completes,
    /// releases or marks it unresolved
    Claimed,
    /// A previous request already succeeded
    Completed(TransferReceipt),
    /// Another request holds the claim
    InFlight,
    /// A previous request ended in an unreconciled inconsistency
    Unresolved,
}

/// Append-only ledger with an idempotency index.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ReferenceClaim, LedgerError>;

    /// Store the receipt for a claimed reference.
    async fn complete(
        &self,
        key: &IdempotencyKey,
        receipt: &TransferReceipt,
    ) -> Result<(), LedgerError>;

    /// Drop an in-flight claim so the client may retry. No-op otherwise.
    async fn release(&self, key: &IdempotencyKey) -> Result<(), LedgerError>;

    async fn mark_unresolved(&self, key: &IdempotencyKey) -> Result<(), LedgerError>;

    /// Append entries. Entries already present (same transaction, type and
    /// account) are skipped, so a retried append never duplicates.
    async fn append(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError>;

    async fn entries_for(&self, tx: TransactionId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// All entries touching an account, oldest first.
    async fn entries_for_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;
}
