//! CommissionLedger port

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::entry::CommissionEntry;
use super::log::LedgerError;
use crate::wallet::AccountId;

/// Per-agent commission balances, kept apart from wallet balances.
///
/// This is the atomic credit primitive for agent commissions: each `credit`
/// updates one agent's balance as a single step, the way
/// `WalletStore::atomic_adjust` does for wallet balances. Commission never
/// moves through the wallet store.
#[async_trait]
pub trait CommissionLedger: Send + Sync {
    /// Record a commission and return the agent's new commission balance.
    ///
    /// Idempotent on `base_transaction_id`: a repeated credit returns the
    /// current balance unchanged.
    async fn credit(&self, entry: &CommissionEntry) -> Result<Decimal, LedgerError>;

    async fn balance(&self, agent: AccountId) -> Result<Decimal, LedgerError>;

    async fn entries_for(&self, agent: AccountId) -> Result<Vec<CommissionEntry>, LedgerError>;
}
