//! Transfer Core Types

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fee::{Commission, TransferClass};
use crate::ledger::TransactionId;
use crate::wallet::AccountId;

/// Length of the customer-facing receipt reference
pub const RECEIPT_REFERENCE_LEN: usize = 10;

/// Transfer request as submitted by a caller.
#[derive(Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_account_id: AccountId,
    /// Raw input; validated by the engine before any lookup
    pub recipient_wallet_number: String,
    pub amount: Decimal,
    #[serde(skip_serializing)]
    pub pin: String,
    /// Facilitating agent; earns commission when the class pays one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Idempotency key, scoped to the sender
    pub client_reference: String,
}

impl TransferRequest {
    pub fn new(
        sender_account_id: AccountId,
        recipient_wallet_number: impl Into<String>,
        amount: Decimal,
        pin: impl Into<String>,
        client_reference: impl Into<String>,
    ) -> Self {
        Self {
            sender_account_id,
            recipient_wallet_number: recipient_wallet_number.into(),
            amount,
            pin: pin.into(),
            agent_id: None,
            description: None,
            client_reference: client_reference.into(),
        }
    }

    pub fn with_agent(mut self, agent_id: AccountId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// PIN never reaches logs
impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("sender_account_id", &self.sender_account_id)
            .field("recipient_wallet_number", &self.recipient_wallet_number)
            .field("amount", &self.amount)
            .field("pin", &"****")
            .field("agent_id", &self.agent_id)
            .field("description", &self.description)
            .field("client_reference", &self.client_reference)
            .finish()
    }
}

/// Success value of a committed transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transaction_id: TransactionId,
    pub receipt_reference: String,
    pub class: TransferClass,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    pub amount: Decimal,
    pub fee: Decimal,
    /// amount + fee
    pub total_debit: Decimal,
    pub new_sender_balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<Commission>,
    pub created_at: DateTime<Utc>,
}

/// Random upper-case alphanumeric reference printed on receipts.
pub fn generate_receipt_reference() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECEIPT_REFERENCE_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_receipt_reference_shape() {
        let reference = generate_receipt_reference();
        assert_eq!(reference.len(), RECEIPT_REFERENCE_LEN);
        assert!(
            reference
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_debug_redacts_pin() {
        let req = TransferRequest::new(AccountId(1), "WLT88800002", dec!(10), "1234", "ref-1");
        let debug = format!("{req:?}");
        assert!(!debug.contains("1234"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "sender_account_id": 1,
            "recipient_wallet_number": "AGT88800001",
            "amount": "250.50",
            "pin": "1234",
            "agent_id": 7,
            "client_reference": "pos-0001"
        }"#;
        let req: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount, dec!(250.50));
        assert_eq!(req.agent_id, Some(AccountId(7)));
        assert!(req.description.is_none());

        let out = serde_json::to_string(&req).unwrap();
        assert!(!out.contains("\"pin\""));
    }
}
