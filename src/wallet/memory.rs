//! In-memory WalletStore
//!
//! Reference implementation of the store contract. Accounts live in a
//! `DashMap`; `atomic_adjust` runs its read-modify-write while holding the
//! entry's exclusive guard, so adjusts on one account serialize and adjusts on
//! different accounts only share a shard lock for the duration of the update.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tracing::debug;

use super::models::{Account, AccountId, AccountStatus};
use super::number::WalletNumber;
use super::store::{WalletStore, WalletStoreError};

/// Thread-safe in-memory account store.
#[derive(Default)]
pub struct InMemoryWalletStore {
    accounts: DashMap<AccountId, Account>,
    /// Wallet number -> account id
    by_number: DashMap<WalletNumber, AccountId>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account (out-of-band account creation).
    pub fn insert(&self, account: Account) -> Result<(), WalletStoreError> {
        if account.balance < Decimal::ZERO {
            return Err(WalletStoreError::InsufficientBalance {
                available: account.balance,
            });
        }
        match self.by_number.entry(account.number.clone()) {
            Entry::Occupied(_) => Err(WalletStoreError::DuplicateAccount(
                account.number.to_string(),
            )),
            Entry::Vacant(slot) => match self.accounts.entry(account.id) {
                Entry::Occupied(_) => Err(WalletStoreError::DuplicateAccount(
                    account.id.to_string(),
                )),
                Entry::Vacant(account_slot) => {
                    slot.insert(account.id);
                    account_slot.insert(account);
                    Ok(())
                }
            },
        }
    }

    /// Suspend or reactivate an account.
    pub fn set_status(&self, id: AccountId, status: AccountStatus) -> Result<(), WalletStoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(WalletStoreError::NotFound(id))?;
        account.status = status;
        Ok(())
    }

    pub fn balance_of(&self, id: AccountId) -> Option<Decimal> {
        self.accounts.get(&id).map(|a| a.balance)
    }

    /// Sum of every balance.
    pub fn total_balance(&self) -> Decimal {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    /// Snapshot of all accounts ordered by id.
    pub fn accounts(&self) -> Vec<Account> {
        let mut all: Vec<Account> = self.accounts.iter().map(|a| a.clone()).collect();
        all.sort_by_key(|a| a.id);
        all
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, WalletStoreError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn get_by_number(
        &self,
        number: &WalletNumber,
    ) -> Result<Option<Account>, WalletStoreError> {
        let Some(id) = self.by_number.get(number).map(|id| *id) else {
            return Ok(None);
        };
        self.get_by_id(id).await
    }

    async fn atomic_adjust(
        &self,
        id: AccountId,
        delta: Decimal,
    ) -> Result<Decimal, WalletStoreError> {
        // Exclusive guard for the whole read-modify-write.
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(WalletStoreError::NotFound(id))?;

        let new_balance = account
            .balance
            .checked_add(delta)
            .ok_or(WalletStoreError::Overflow(id))?;
        if new_balance < Decimal::ZERO {
            return Err(WalletStoreError::InsufficientBalance {
                available: account.balance,
            });
        }

        account.balance = new_balance;
        account.version += 1;
        debug!(
            account_id = %id,
            delta = %delta,
            balance = %new_balance,
            version = account.version,
            "Balance adjusted"
        );
        Ok(new_balance)
    }
}
