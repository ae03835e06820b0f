use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

use crate::fee::FeeSchedule;
use crate::pin::{LockoutPolicy, PinHashParams};
use crate::transfer::EngineConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// hourly | daily | never
    pub rotation: String,
    /// Emit `audit` target events for committed transfers
    pub enable_audit: bool,
    pub transfer: EngineConfig,
    pub pin: PinConfig,
    pub fees: FeeSchedule,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "wallet_ledger.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            enable_audit: true,
            transfer: EngineConfig::default(),
            pin: PinConfig::default(),
            fees: FeeSchedule::standard(),
        }
    }
}

/// Longest accepted lockout window (one year)
pub const MAX_LOCKOUT_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PinConfig {
    pub max_attempts: u32,
    pub lockout_minutes: i64,
    pub hash: PinHashParams,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_minutes: 30,
            hash: PinHashParams::default(),
        }
    }
}

impl PinConfig {
    /// Window is clamped to `1..=MAX_LOCKOUT_MINUTES`; `validate` rejects
    /// values outside it when loading.
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: self.max_attempts,
            lockout_window: Duration::minutes(self.lockout_minutes.clamp(1, MAX_LOCKOUT_MINUTES)),
        }
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(format!("config/{}.yaml", env))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.fees.validate().map_err(ConfigError::Invalid)?;
        if self.pin.max_attempts == 0 {
            return Err(ConfigError::Invalid("pin.max_attempts must be > 0".into()));
        }
        if !(1..=MAX_LOCKOUT_MINUTES).contains(&self.pin.lockout_minutes) {
            return Err(ConfigError::Invalid(format!(
                "pin.lockout_minutes must be in 1..={MAX_LOCKOUT_MINUTES}"
            )));
        }
        Ok(())
    }
}
