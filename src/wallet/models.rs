//! Data models for wallet accounts

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::number::WalletNumber;

/// Internal account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the person or business owning an account (and its PIN)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    User,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// Wallet account record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub number: WalletNumber,
    pub owner_id: OwnerId,
    /// Display name shown to senders when confirming a recipient
    pub owner_name: String,
    /// Never negative after a committed adjust
    pub balance: Decimal,
    pub class: AccountClass,
    #[serde(default)]
    pub status: AccountStatus,
    /// Bumped by every committed balance adjust
    #[serde(default)]
    pub version: u64,
}

impl Account {
    /// New active account; the class follows the wallet number prefix.
    pub fn new(
        id: AccountId,
        number: WalletNumber,
        owner_id: OwnerId,
        owner_name: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            id,
            class: number.class(),
            number,
            owner_id,
            owner_name: owner_name.into(),
            balance,
            status: AccountStatus::Active,
            version: 0,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    #[inline]
    pub fn is_agent(&self) -> bool {
        self.class == AccountClass::Agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_class_follows_prefix() {
        let agent = Account::new(
            AccountId(7),
            WalletNumber::parse("AGT88800007").unwrap(),
            OwnerId(70),
            "Corner Shop",
            dec!(0),
        );
        assert!(agent.is_agent());
        assert!(agent.is_active());
        assert_eq!(agent.version, 0);
    }

    #[test]
    fn test_status_default_on_deserialize() {
        let json = r#"{
            "id": 1,
            "number": "WLT88800001",
            "owner_id": 10,
            "owner_name": "Alice",
            "balance": "100.00",
            "class": "user"
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.balance, dec!(100));
    }
}
