//! Wallet Ledger - mobile-money transfer engine
//!
//! Moves value between wallet balances (user-to-user, agent-to-user,
//! agent-to-agent) as one logical operation over a store that only offers
//! per-account atomic adjusts, with fees, agent commissions, PIN lockout and
//! compensation when a transfer fails halfway.
//!
//! # Modules
//!
//! - [`money`] - Decimal rounding and amount validation
//! - [`wallet`] - Accounts, wallet numbers and the `WalletStore` port
//! - [`fee`] - Transfer classes, fee and commission tables
//! - [`pin`] - PIN hashing and lockout
//! - [`ledger`] - Transaction log, idempotency index, commission ledger
//! - [`alert`] - Operator alerts for unreconciled inconsistencies
//! - [`transfer`] - The transfer engine
//! - [`config`] / [`logging`] - Runtime configuration and tracing setup
//! - [`scenario`] - YAML fixtures for seeding and driving the engine

pub mod alert;
pub mod clock;
pub mod config;
pub mod fee;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod pin;
pub mod scenario;
pub mod transfer;
pub mod wallet;

// Convenient re-exports at crate root
pub use alert::{AlertSink, CollectingAlertSink, InconsistencyAlert, TracingAlertSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use fee::{CommissionCalculator, FeeCalculator, FeeSchedule, TransferClass};
pub use ledger::{
    CommissionLedger, InMemoryCommissionLedger, InMemoryTransactionLog, TransactionId,
    TransactionLog,
};
pub use pin::{ArgonPinVault, PinVault};
pub use transfer::{
    EngineConfig, EnginePorts, RecipientCheck, TransferEngine, TransferError, TransferReceipt,
    TransferRequest, TransferResult,
};
pub use wallet::{Account, AccountId, InMemoryWalletStore, OwnerId, WalletNumber, WalletStore};
