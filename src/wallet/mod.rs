//! Wallet accounts
//!
//! Account records, the wallet number format, and the [`WalletStore`] port
//! through which every balance mutation flows.
//!
//! # Store Contract
//!
//! - `atomic_adjust` is a single atomic read-modify-write per account
//! - a negative delta never drives a balance below zero
//! - a failed adjust leaves the account untouched
//! - concurrent adjusts on one account serialize; different accounts never contend

pub mod memory;
pub mod models;
pub mod number;
pub mod store;

pub use memory::InMemoryWalletStore;
pub use models::{Account, AccountClass, AccountId, AccountStatus, OwnerId};
pub use number::{WalletNumber, WalletNumberError};
pub use store::{WalletStore, WalletStoreError};
