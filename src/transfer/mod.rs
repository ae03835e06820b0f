//! Wallet transfer engine
//!
//! Moves value between two wallet balances as one logical operation on top of
//! a store that only offers independent per-account atomic adjusts.
//!
//! # State Machine
//!
//! ```text
//! INIT → DEBITED → COMMITTED
//!   ↓        ↓
//! FAILED  COMPENSATING → ROLLED_BACK
//!                 ↓
//!            UNRESOLVED (alert raised)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **No Overdraft**: the debit is a single atomic adjust that refuses to go negative
//! 2. **Conservation**: a debit is either matched by a credit or returned to the sender
//! 3. **Escalation**: a debit that can be neither credited nor returned reaches the `AlertSink`
//! 4. **Idempotency**: one client reference moves money at most once

pub mod api;
pub mod engine;
pub mod error;
pub mod retry;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{RecipientCheck, TransferResult};
pub use engine::{EngineConfig, EnginePorts, TransferEngine};
pub use error::TransferError;
pub use retry::RetryPolicy;
pub use state::TransferState;
pub use types::{TransferReceipt, TransferRequest};
