//! PIN record and lockout transitions
//!
//! Pure state transitions; the vault applies them under a per-owner guard.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::wallet::OwnerId;

/// Lockout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lock
    pub max_attempts: u32,
    /// How long a lock lasts
    pub lockout_window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_window: Duration::minutes(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinState {
    Unlocked { failed_attempts: u32 },
    Locked { until: DateTime<Utc> },
}

impl PinState {
    pub fn is_locked(&self) -> bool {
        matches!(self, PinState::Locked { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    pub owner_id: OwnerId,
    /// argon2 PHC string
    pub pin_hash: String,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl PinRecord {
    pub fn new(owner_id: OwnerId, pin_hash: String) -> Self {
        Self {
            owner_id,
            pin_hash,
            failed_attempts: 0,
            locked_until: None,
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> PinState {
        match self.locked_until {
            Some(until) if until > now => PinState::Locked { until },
            _ => PinState::Unlocked {
                failed_attempts: self.failed_attempts,
            },
        }
    }

    /// LOCKED -> UNLOCKED once the window has elapsed. Returns true on transition.
    pub fn expire_lock(&mut self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            Some(until) if until <= now => {
                self.unlock();
                true
            }
            _ => false,
        }
    }

    /// Register a mismatch. Returns the attempts left before the lock
    /// (0 means this failure locked the record).
    ///
    /// Must not be called while locked.
    pub fn record_failure(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) -> u32 {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        if self.failed_attempts >= policy.max_attempts {
            self.locked_until = Some(now + policy.lockout_window);
        }
        policy.max_attempts.saturating_sub(self.failed_attempts)
    }

    pub fn record_success(&mut self) {
        self.failed_attempts = 0;
    }

    /// Admin reset or window expiry.
    pub fn unlock(&mut self) {
        self.failed_attempts = 0;
        self.locked_until = None;
    }
}
