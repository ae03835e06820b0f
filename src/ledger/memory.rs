//! In-memory TransactionLog and CommissionLedger

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tracing::debug;

use super::commission::CommissionLedger;
use super::entry::{CommissionEntry, LedgerEntry, TransactionId};
use super::log::{IdempotencyKey, LedgerError, ReferenceClaim, TransactionLog};
use crate::transfer::TransferReceipt;
use crate::wallet::AccountId;

#[derive(Debug, Clone)]
enum ClaimSlot {
    InFlight,
    Completed(Box<TransferReceipt>),
    Unresolved,
}

/// Thread-safe in-memory transaction log.
#[derive(Default)]
pub struct InMemoryTransactionLog {
    claims: DashMap<IdempotencyKey, ClaimSlot>,
    /// Entries grouped by transaction
    entries: DashMap<TransactionId, Vec<LedgerEntry>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all transactions.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().map(|e| e.len()).sum()
    }

    /// Snapshot of every entry ordered by transaction id.
    pub fn all_entries(&self) -> Vec<LedgerEntry> {
        let mut all: Vec<LedgerEntry> = self
            .entries
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|e| (e.transaction_id, e.created_at));
        all
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ReferenceClaim, LedgerError> {
        match self.claims.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(ClaimSlot::InFlight);
                Ok(ReferenceClaim::Claimed)
            }
            Entry::Occupied(slot) => Ok(match slot.get() {
                ClaimSlot::InFlight => ReferenceClaim::InFlight,
                ClaimSlot::Completed(receipt) => ReferenceClaim::Completed((**receipt).clone()),
                ClaimSlot::Unresolved => ReferenceClaim::Unresolved,
            }),
        }
    }

    async fn complete(
        &self,
        key: &IdempotencyKey,
        receipt: &TransferReceipt,
    ) -> Result<(), LedgerError> {
        self.claims
            .insert(key.clone(), ClaimSlot::Completed(Box::new(receipt.clone())));
        Ok(())
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), LedgerError> {
        self.claims
            .remove_if(key, |_, slot| matches!(slot, ClaimSlot::InFlight));
        Ok(())
    }

    async fn mark_unresolved(&self, key: &IdempotencyKey) -> Result<(), LedgerError> {
        self.claims.insert(key.clone(), ClaimSlot::Unresolved);
        Ok(())
    }

    async fn append(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        for entry in entries {
            let mut group = self.entries.entry(entry.transaction_id).or_default();
            if group.iter().any(|existing| existing.key() == entry.key()) {
                debug!(
                    transaction_id = %entry.transaction_id,
                    entry_type = %entry.entry_type,
                    "Ledger entry already present, skipped"
                );
                continue;
            }
            group.push(entry.clone());
        }
        Ok(())
    }

    async fn entries_for(&self, tx: TransactionId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .entries
            .get(&tx)
            .map(|group| group.clone())
            .unwrap_or_default())
    }

    async fn entries_for_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut matching: Vec<LedgerEntry> = self
            .entries
            .iter()
            .flat_map(|group| {
                group
                    .iter()
                    .filter(|e| e.account_id == account)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        matching.sort_by_key(|e| (e.created_at, e.transaction_id));
        Ok(matching)
    }
}

/// Thread-safe in-memory commission ledger.
#[derive(Default)]
pub struct InMemoryCommissionLedger {
    /// Keyed by the transfer that earned the commission
    entries: DashMap<TransactionId, CommissionEntry>,
    balances: DashMap<AccountId, Decimal>,
}

impl InMemoryCommissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all commission balances.
    pub fn total(&self) -> Decimal {
        self.balances.iter().map(|b| *b.value()).sum()
    }
}

#[async_trait]
impl CommissionLedger for InMemoryCommissionLedger {
    async fn credit(&self, entry: &CommissionEntry) -> Result<Decimal, LedgerError> {
        // The entry guard is held while the balance moves, so a concurrent
        // retry for the same transaction sees the entry and skips.
        match self.entries.entry(entry.base_transaction_id) {
            Entry::Occupied(_) => Ok(self
                .balances
                .get(&entry.agent_id)
                .map(|b| *b)
                .unwrap_or_default()),
            Entry::Vacant(slot) => {
                let mut balance = self.balances.entry(entry.agent_id).or_default();
                let new_balance = balance.checked_add(entry.amount).ok_or_else(|| {
                    LedgerError::WriteFailed(format!(
                        "commission balance overflow for agent {}",
                        entry.agent_id
                    ))
                })?;
                *balance = new_balance;
                slot.insert(entry.clone());
                Ok(new_balance)
            }
        }
    }

    async fn balance(&self, agent: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self.balances.get(&agent).map(|b| *b).unwrap_or_default())
    }

    async fn entries_for(&self, agent: AccountId) -> Result<Vec<CommissionEntry>, LedgerError> {
        let mut matching: Vec<CommissionEntry> = self
            .entries
            .iter()
            .filter(|e| e.agent_id == agent)
            .map(|e| e.value().clone())
            .collect();
        matching.sort_by_key(|e| e.base_transaction_id);
        Ok(matching)
    }
}
