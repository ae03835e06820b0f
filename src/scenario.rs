//! Scenario fixtures
//!
//! YAML description of opening balances, PINs and a batch of transfer
//! requests, used by the binary to seed in-memory stores and drive the engine.
//!
//! ```yaml
//! accounts:
//!   - id: 1
//!     number: WLT88800001
//!     owner_id: 101
//!     owner_name: Alice
//!     balance: "1000.00"
//!     pin: "1234"
//! transfers:
//!   - sender_account_id: 1
//!     recipient_wallet_number: WLT88800002
//!     amount: "500"
//!     pin: "1234"
//!     client_reference: demo-1
//! ```

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::pin::PinVault;
use crate::transfer::TransferRequest;
use crate::wallet::{Account, AccountId, AccountStatus, InMemoryWalletStore, OwnerId, WalletNumber};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to seed account {account}: {reason}")]
    Seed { account: AccountId, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAccount {
    pub id: AccountId,
    pub number: WalletNumber,
    pub owner_id: OwnerId,
    pub owner_name: String,
    pub balance: Decimal,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub accounts: Vec<SeedAccount>,
    #[serde(default)]
    pub transfers: Vec<TransferRequest>,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Open every account and enroll the PINs given.
    pub async fn seed(
        &self,
        store: &InMemoryWalletStore,
        pins: &dyn PinVault,
    ) -> Result<(), ScenarioError> {
        for seed in &self.accounts {
            let mut account = Account::new(
                seed.id,
                seed.number.clone(),
                seed.owner_id,
                seed.owner_name.clone(),
                seed.balance,
            );
            account.status = seed.status;
            store.insert(account).map_err(|e| ScenarioError::Seed {
                account: seed.id,
                reason: e.to_string(),
            })?;

            if let Some(pin) = &seed.pin {
                pins.set_pin(seed.owner_id, pin)
                    .await
                    .map_err(|e| ScenarioError::Seed {
                        account: seed.id,
                        reason: e.to_string(),
                    })?;
            }
        }
        info!(
            accounts = self.accounts.len(),
            transfers = self.transfers.len(),
            "Scenario seeded"
        );
        Ok(())
    }
}
