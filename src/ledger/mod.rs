//! Transaction log and commission ledger
//!
//! Append-only records of every committed balance movement, the idempotency
//! index keyed by client reference, and per-agent commission balances.

pub mod commission;
pub mod entry;
pub mod log;
pub mod memory;

pub use commission::CommissionLedger;
pub use entry::{CommissionEntry, EntryType, LedgerEntry, TransactionId};
pub use log::{IdempotencyKey, LedgerError, ReferenceClaim, TransactionLog};
pub use memory::{InMemoryCommissionLedger, InMemoryTransactionLog};
