//! WalletStore port

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::models::{Account, AccountId};
use super::number::WalletNumber;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletStoreError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// The adjust would have made the balance negative; nothing was written.
    #[error("Insufficient balance: available {available}")]
    InsufficientBalance { available: Decimal },

    /// Optimistic write lost a race; the caller may re-read and retry.
    #[error("Concurrent update conflict")]
    ConcurrencyConflict,

    /// The result would not fit in a `Decimal`; nothing was written.
    #[error("Balance overflow on account {0}")]
    Overflow(AccountId),

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl WalletStoreError {
    /// Conflicts and transient outages are safe to retry; the adjust did not apply.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletStoreError::ConcurrencyConflict | WalletStoreError::Unavailable(_)
        )
    }
}

/// Keyed access to account records plus the atomic balance primitive.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, WalletStoreError>;

    async fn get_by_number(
        &self,
        number: &WalletNumber,
    ) -> Result<Option<Account>, WalletStoreError>;

    /// Add `delta` (may be negative) to the balance as one atomic
    /// read-modify-write and return the new balance.
    ///
    /// # Errors
    /// - `InsufficientBalance` if the result would be negative
    /// - `Overflow` if the result is out of `Decimal` range
    /// - `ConcurrencyConflict` if a concurrent writer won
    ///
    /// No error variant leaves a partial write behind.
    async fn atomic_adjust(&self, id: AccountId, delta: Decimal)
    -> Result<Decimal, WalletStoreError>;
}
