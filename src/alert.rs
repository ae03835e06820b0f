//! Operator alerts for unreconciled balance inconsistencies
//!
//! Raised when a debit could not be returned to the sender after a failed
//! credit: money has left one balance without reaching another and needs
//! manual cleanup.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::error;

use crate::ledger::TransactionId;
use crate::wallet::AccountId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InconsistencyAlert {
    pub transaction_id: TransactionId,
    pub client_reference: String,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    /// Amount debited from the sender and not returned
    pub outstanding: Decimal,
    pub reason: String,
    pub detected_at: DateTime<Utc>,
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn raise(&self, alert: InconsistencyAlert);
}

/// Emits alerts as `error!` events on the `alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn raise(&self, alert: InconsistencyAlert) {
        error!(
            target: "alert",
            transaction_id = %alert.transaction_id,
            client_reference = %alert.client_reference,
            sender = %alert.sender_account_id,
            recipient = %alert.recipient_account_id,
            outstanding = %alert.outstanding,
            reason = %alert.reason,
            "🚨 BALANCE INCONSISTENCY: manual reconciliation required"
        );
    }
}

/// Keeps raised alerts in memory, and logs them like [`TracingAlertSink`].
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    alerts: Mutex<Vec<InconsistencyAlert>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<InconsistencyAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AlertSink for CollectingAlertSink {
    async fn raise(&self, alert: InconsistencyAlert) {
        TracingAlertSink.raise(alert.clone()).await;
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert);
    }
}
