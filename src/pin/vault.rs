//! PinVault port and argon2id-backed implementation

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::record::{LockoutPolicy, PinRecord, PinState};
use crate::clock::Clock;
use crate::wallet::OwnerId;

const PIN_MIN_LEN: usize = 4;
const PIN_MAX_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PinError {
    #[error("No PIN enrolled")]
    NotEnrolled,

    #[error("PIN locked until {until}")]
    Locked { until: DateTime<Utc> },

    #[error("Invalid PIN, {attempts_remaining} attempts remaining")]
    Mismatch { attempts_remaining: u32 },

    #[error("PIN must be {PIN_MIN_LEN} to {PIN_MAX_LEN} digits")]
    Malformed,

    #[error("PIN hashing failed: {0}")]
    Hash(String),
}

/// Per-owner PIN authorization.
#[async_trait]
pub trait PinVault: Send + Sync {
    /// Check `pin` against the owner's stored hash and apply lockout rules.
    async fn validate(&self, owner: OwnerId, pin: &str) -> Result<(), PinError>;

    /// Enroll or replace the owner's PIN. Clears any lock.
    async fn set_pin(&self, owner: OwnerId, pin: &str) -> Result<(), PinError>;

    /// Admin unlock.
    async fn reset_lockout(&self, owner: OwnerId) -> Result<(), PinError>;

    async fn status(&self, owner: OwnerId) -> Result<PinState, PinError>;
}

/// argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PinHashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PinHashParams {
    /// OWASP minimum for argon2id
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PinHashParams {
    /// Cheapest parameters argon2 accepts. Tests only.
    pub fn fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

fn check_format(pin: &str) -> Result<(), PinError> {
    let len_ok = (PIN_MIN_LEN..=PIN_MAX_LEN).contains(&pin.len());
    if len_ok && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PinError::Malformed)
    }
}

/// In-memory vault storing argon2id PHC strings.
///
/// Hash verification runs on the blocking pool without holding the owner's
/// entry; the counter update re-acquires it and re-checks the lock state.
pub struct ArgonPinVault {
    records: DashMap<OwnerId, PinRecord>,
    hasher: Argon2<'static>,
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

impl ArgonPinVault {
    pub fn new(
        policy: LockoutPolicy,
        params: PinHashParams,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PinError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| PinError::Hash(e.to_string()))?;
        Ok(Self {
            records: DashMap::new(),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            policy,
            clock,
        })
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    async fn hash(&self, pin: &str) -> Result<String, PinError> {
        let hasher = self.hasher.clone();
        let pin = pin.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(pin.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| PinError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| PinError::Hash(e.to_string()))?
    }

    async fn verify(&self, pin_hash: String, pin: &str) -> Result<bool, PinError> {
        let hasher = self.hasher.clone();
        let pin = pin.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&pin_hash).map_err(|e| PinError::Hash(e.to_string()))?;
            Ok(hasher.verify_password(pin.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| PinError::Hash(e.to_string()))?
    }
}

#[async_trait]
impl PinVault for ArgonPinVault {
    async fn validate(&self, owner: OwnerId, pin: &str) -> Result<(), PinError> {
        let pin_hash = {
            let mut record = self.records.get_mut(&owner).ok_or(PinError::NotEnrolled)?;
            let now = self.clock.now();
            if record.expire_lock(now) {
                info!(owner_id = %owner, "PIN lock expired");
            }
            if let PinState::Locked { until } = record.state(now) {
                return Err(PinError::Locked { until });
            }
            record.pin_hash.clone()
        };

        let matched = check_format(pin).is_ok() && self.verify(pin_hash, pin).await?;

        let mut record = self.records.get_mut(&owner).ok_or(PinError::NotEnrolled)?;
        let now = self.clock.now();
        record.expire_lock(now);
        // A concurrent validation may have locked the record meanwhile
        if let PinState::Locked { until } = record.state(now) {
            return Err(PinError::Locked { until });
        }

        if matched {
            record.record_success();
            return Ok(());
        }

        let attempts_remaining = record.record_failure(now, &self.policy);
        if attempts_remaining == 0 {
            warn!(
                owner_id = %owner,
                locked_until = ?record.locked_until,
                "PIN locked after {} failed attempts",
                self.policy.max_attempts
            );
        } else {
            debug!(owner_id = %owner, attempts_remaining, "PIN mismatch");
        }
        Err(PinError::Mismatch { attempts_remaining })
    }

    async fn set_pin(&self, owner: OwnerId, pin: &str) -> Result<(), PinError> {
        check_format(pin)?;
        let pin_hash = self.hash(pin).await?;
        self.records.insert(owner, PinRecord::new(owner, pin_hash));
        info!(owner_id = %owner, "PIN set");
        Ok(())
    }

    async fn reset_lockout(&self, owner: OwnerId) -> Result<(), PinError> {
        let mut record = self.records.get_mut(&owner).ok_or(PinError::NotEnrolled)?;
        record.unlock();
        info!(owner_id = %owner, "PIN lockout reset");
        Ok(())
    }

    async fn status(&self, owner: OwnerId) -> Result<PinState, PinError> {
        let record = self.records.get(&owner).ok_or(PinError::NotEnrolled)?;
        Ok(record.state(self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn vault_with_clock() -> (ArgonPinVault, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let vault = ArgonPinVault::new(
            LockoutPolicy::default(),
            PinHashParams::fast(),
            clock.clone(),
        )
        .unwrap();
        (vault, clock)
    }

    #[test]
    fn test_pin_format() {
        assert!(check_format("1234").is_ok());
        assert!(check_format("123456").is_ok());
        assert_eq!(check_format("123"), Err(PinError::Malformed));
        assert_eq!(check_format("1234567"), Err(PinError::Malformed));
        assert_eq!(check_format("12a4"), Err(PinError::Malformed));
    }

    #[tokio::test]
    async fn test_set_and_validate() {
        let (vault, _) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();

        assert!(vault.validate(OwnerId(1), "2468").await.is_ok());
        assert_eq!(
            vault.validate(OwnerId(2), "2468").await,
            Err(PinError::NotEnrolled)
        );
        assert_eq!(
            vault.set_pin(OwnerId(1), "12").await,
            Err(PinError::Malformed)
        );
    }

    #[tokio::test]
    async fn test_stored_hash_is_argon2id() {
        let (vault, _) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();
        let stored = vault.records.get(&OwnerId(1)).unwrap().pin_hash.clone();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("2468"));
    }

    #[tokio::test]
    async fn test_lockout_after_five_failures() {
        let (vault, _) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();

        for expected in [4, 3, 2, 1, 0] {
            assert_eq!(
                vault.validate(OwnerId(1), "0000").await,
                Err(PinError::Mismatch {
                    attempts_remaining: expected
                })
            );
        }

        // 6th attempt, even with the right PIN, is rejected without counting
        let err = vault.validate(OwnerId(1), "2468").await.unwrap_err();
        assert!(matches!(err, PinError::Locked { .. }));
        assert_eq!(vault.records.get(&OwnerId(1)).unwrap().failed_attempts, 5);
    }

    #[tokio::test]
    async fn test_malformed_attempt_counts_as_failure() {
        let (vault, _) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();
        assert_eq!(
            vault.validate(OwnerId(1), "abc").await,
            Err(PinError::Mismatch {
                attempts_remaining: 4
            })
        );
    }

    #[tokio::test]
    async fn test_success_clears_counter() {
        let (vault, _) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();

        let _ = vault.validate(OwnerId(1), "0000").await;
        let _ = vault.validate(OwnerId(1), "0000").await;
        vault.validate(OwnerId(1), "2468").await.unwrap();

        assert_eq!(
            vault.status(OwnerId(1)).await.unwrap(),
            PinState::Unlocked { failed_attempts: 0 }
        );
    }

    #[tokio::test]
    async fn test_lock_expires_with_clock() {
        let (vault, clock) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();
        for _ in 0..5 {
            let _ = vault.validate(OwnerId(1), "0000").await;
        }
        assert!(vault.status(OwnerId(1)).await.unwrap().is_locked());

        clock.advance(Duration::minutes(29));
        assert!(vault.validate(OwnerId(1), "2468").await.is_err());

        clock.advance(Duration::minutes(1));
        vault.validate(OwnerId(1), "2468").await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_reset() {
        let (vault, _) = vault_with_clock();
        vault.set_pin(OwnerId(1), "2468").await.unwrap();
        for _ in 0..5 {
            let _ = vault.validate(OwnerId(1), "0000").await;
        }

        vault.reset_lockout(OwnerId(1)).await.unwrap();
        assert_eq!(
            vault.validate(OwnerId(1), "0000").await,
            Err(PinError::Mismatch {
                attempts_remaining: 4
            })
        );
        assert_eq!(
            vault.reset_lockout(OwnerId(9)).await,
            Err(PinError::NotEnrolled)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_lock_once() {
        let (vault, _) = vault_with_clock();
        let vault = Arc::new(vault);
        vault.set_pin(OwnerId(1), "2468").await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let vault = vault.clone();
                tokio::spawn(async move { vault.validate(OwnerId(1), "0000").await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }

        // Counter never runs past the threshold
        assert_eq!(vault.records.get(&OwnerId(1)).unwrap().failed_attempts, 5);
    }
}
