//! Transfer Error Types
//!
//! Every rejection the engine can return. Codes are stable strings for
//! caller-facing envelopes; `Display` is safe to show to end users except
//! for [`TransferError::ServiceUnavailable`], whose detail is internal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::money::format_money;
use crate::pin::PinError;
use crate::wallet::WalletStoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Amount must be greater than zero with at most two decimal places")]
    AmountInvalid,

    #[error("Invalid wallet number format")]
    WalletFormatInvalid,

    // === Account Errors ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Account is suspended")]
    AccountSuspended,

    #[error("Cannot transfer to your own wallet")]
    SelfTransfer,

    #[error(
        "Insufficient funds: required {}, available {}",
        format_money(*required),
        format_money(*available)
    )]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    // === Authorization Errors ===
    #[error("Invalid PIN, {attempts_remaining} attempts remaining")]
    InvalidPin { attempts_remaining: u32 },

    #[error("Account locked until {}", locked_until.format("%Y-%m-%d %H:%M UTC"))]
    AccountLocked { locked_until: DateTime<Utc> },

    #[error("No PIN set for this account")]
    PinNotSet,

    // === Execution Errors ===
    /// Nothing moved, or the debit was returned
    #[error("Transfer failed, no funds were moved")]
    TransferFailed,

    /// The debit could not be returned; the reference is held for reconciliation
    #[error("Transfer could not be completed and is under review")]
    CreditFailed,

    // === Idempotency Errors ===
    #[error("A request with this reference is already in progress")]
    DuplicateRequest,

    // === System Errors ===
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl TransferError {
    /// Get the error code for caller-facing envelopes
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::AmountInvalid => "AMOUNT_INVALID",
            TransferError::WalletFormatInvalid => "WALLET_FORMAT_INVALID",
            TransferError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            TransferError::AccountSuspended => "ACCOUNT_SUSPENDED",
            TransferError::SelfTransfer => "SELF_TRANSFER",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::InvalidPin { .. } => "INVALID_PIN",
            TransferError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            TransferError::PinNotSet => "PIN_NOT_SET",
            TransferError::TransferFailed => "TRANSFER_FAILED",
            TransferError::CreditFailed => "CREDIT_FAILED",
            TransferError::DuplicateRequest => "DUPLICATE_REQUEST",
            TransferError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Message safe to show to the customer.
    pub fn user_message(&self) -> String {
        match self {
            TransferError::ServiceUnavailable(_) => {
                "Service temporarily unavailable, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<WalletStoreError> for TransferError {
    fn from(e: WalletStoreError) -> Self {
        match e {
            WalletStoreError::NotFound(_) => TransferError::AccountNotFound,
            WalletStoreError::ConcurrencyConflict
            | WalletStoreError::InsufficientBalance { .. }
            | WalletStoreError::Overflow(_) => TransferError::TransferFailed,
            WalletStoreError::DuplicateAccount(msg) | WalletStoreError::Unavailable(msg) => {
                TransferError::ServiceUnavailable(msg)
            }
        }
    }
}

impl From<PinError> for TransferError {
    fn from(e: PinError) -> Self {
        match e {
            PinError::NotEnrolled => TransferError::PinNotSet,
            PinError::Locked { until } => TransferError::AccountLocked {
                locked_until: until,
            },
            PinError::Mismatch { attempts_remaining } => {
                TransferError::InvalidPin { attempts_remaining }
            }
            PinError::Malformed | PinError::Hash(_) => {
                TransferError::ServiceUnavailable(format!("pin vault: {e}"))
            }
        }
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        TransferError::ServiceUnavailable(e.to_string())
    }
}
