//! Wallet number validation
//!
//! A wallet number is a 6-character class prefix followed by exactly 5 ASCII
//! decimal digits (11 characters total). The prefix encodes the account class:
//!
//! ```text
//! WLT888 00001   user wallet
//! AGT888 00001   agent float
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::AccountClass;

/// Prefix of user wallet numbers
pub const USER_PREFIX: &str = "WLT888";
/// Prefix of agent wallet numbers
pub const AGENT_PREFIX: &str = "AGT888";

const PREFIX_LEN: usize = 6;
const DIGITS_LEN: usize = 5;
/// Total length of a wallet number
pub const WALLET_NUMBER_LEN: usize = PREFIX_LEN + DIGITS_LEN;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WalletNumberError {
    #[error("Invalid wallet number length: expected {WALLET_NUMBER_LEN}, got {0}")]
    InvalidLength(usize),

    #[error("Unknown wallet number prefix")]
    UnknownPrefix,

    #[error("Wallet number must end with {DIGITS_LEN} decimal digits")]
    InvalidDigits,
}

/// Validated wallet number.
///
/// The inner string is private so every instance went through [`WalletNumber::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletNumber(String);

impl WalletNumber {
    /// Validate a wallet number. No trimming or case folding is applied.
    ///
    /// # Examples
    /// ```
    /// use wallet_ledger::wallet::WalletNumber;
    ///
    /// assert!(WalletNumber::parse("WLT88800001").is_ok());
    /// assert!(WalletNumber::parse("WLT888001").is_err()); // 9 characters
    /// ```
    pub fn parse(value: &str) -> Result<Self, WalletNumberError> {
        if value.len() != WALLET_NUMBER_LEN {
            return Err(WalletNumberError::InvalidLength(value.len()));
        }
        // Length is checked on bytes; a multi-byte char would fail the prefix or digit checks.
        let (prefix, digits) = value
            .split_at_checked(PREFIX_LEN)
            .ok_or(WalletNumberError::UnknownPrefix)?;
        if prefix != USER_PREFIX && prefix != AGENT_PREFIX {
            return Err(WalletNumberError::UnknownPrefix);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WalletNumberError::InvalidDigits);
        }
        Ok(Self(value.to_string()))
    }

    /// Build the number for a class and sequence (`0..=99_999`).
    pub fn from_parts(class: AccountClass, sequence: u32) -> Result<Self, WalletNumberError> {
        if sequence > 99_999 {
            return Err(WalletNumberError::InvalidDigits);
        }
        let prefix = match class {
            AccountClass::User => USER_PREFIX,
            AccountClass::Agent => AGENT_PREFIX,
        };
        Ok(Self(format!("{prefix}{sequence:05}")))
    }

    /// Account class encoded in the prefix.
    pub fn class(&self) -> AccountClass {
        if self.0.starts_with(AGENT_PREFIX) {
            AccountClass::Agent
        } else {
            AccountClass::User
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletNumber {
    type Err = WalletNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletNumber {
    type Error = WalletNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletNumber> for String {
    fn from(number: WalletNumber) -> Self {
        number.0
    }
}
