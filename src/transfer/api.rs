//! Caller-facing envelopes
//!
//! Flat, serializable views of engine outcomes for whatever surface sits in
//! front of the engine (HTTP handler, USSD gateway, CLI).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TransferError;
use super::types::TransferReceipt;

// ============================================================================
// Transfer Result
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_sender_balance: Option<Decimal>,
    /// Stable error code, see [`TransferError::code`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl TransferResult {
    pub fn success(receipt: &TransferReceipt) -> Self {
        Self {
            success: true,
            transaction_id: Some(receipt.transaction_id.to_string()),
            receipt_reference: Some(receipt.receipt_reference.clone()),
            fee: Some(receipt.fee),
            new_sender_balance: Some(receipt.new_sender_balance),
            error: None,
            message: "Transfer successful".to_string(),
        }
    }

    pub fn failure(err: &TransferError) -> Self {
        Self {
            success: false,
            transaction_id: None,
            receipt_reference: None,
            fee: None,
            new_sender_balance: None,
            error: Some(err.code().to_string()),
            message: err.user_message(),
        }
    }

    pub fn from_outcome(outcome: &Result<TransferReceipt, TransferError>) -> Self {
        match outcome {
            Ok(receipt) => Self::success(receipt),
            Err(err) => Self::failure(err),
        }
    }
}

// ============================================================================
// Recipient Check
// ============================================================================

/// Answer to "who am I sending to?" before the sender enters a PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

impl RecipientCheck {
    pub fn found(owner_name: impl Into<String>) -> Self {
        Self {
            valid: true,
            owner_name: Some(owner_name.into()),
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            owner_name: None,
        }
    }
}
