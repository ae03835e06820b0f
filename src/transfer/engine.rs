//! Transfer Engine
//!
//! Validates, authorizes and executes one transfer as two independent atomic
//! balance adjusts (debit sender, credit recipient), compensating the debit
//! when the credit cannot be applied.
//!
//! There is no engine-wide lock. Concurrent transfers serialize only on the
//! store's per-account `atomic_adjust`.
//!
//! Everything after the idempotency claim runs on a spawned task, so a caller
//! that stops waiting (timeout, dropped request) cannot leave a transfer
//! between debit and credit. The caller only awaits its outcome.
//!
//! Ledger appends, idempotency completion and commission credits get one
//! inline attempt; on failure they are retried by a spawned task and never
//! change the caller-visible outcome.

use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::api::RecipientCheck;
use super::error::TransferError;
use super::retry::RetryPolicy;
use super::state::TransferState;
use super::types::{TransferReceipt, TransferRequest, generate_receipt_reference};
use crate::alert::{AlertSink, InconsistencyAlert};
use crate::clock::Clock;
use crate::fee::{CommissionCalculator, FeeCalculator, FeeSchedule, TransferClass};
use crate::ledger::{
    CommissionEntry, CommissionLedger, EntryType, IdempotencyKey, LedgerEntry, LedgerError,
    ReferenceClaim, TransactionId, TransactionLog,
};
use crate::logging::AUDIT_TARGET;
use crate::money::is_valid_amount;
use crate::pin::PinVault;
use crate::wallet::{Account, AccountId, WalletNumber, WalletStore, WalletStoreError};

/// Retry budgets of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sender debit on conflict or transient outage (balance is re-read between tries)
    pub debit: RetryPolicy,
    /// Recipient credit before compensating
    pub credit: RetryPolicy,
    /// Returning the debit after a failed credit; exhaustion raises an alert
    pub compensation: RetryPolicy,
    /// Deferred ledger, idempotency and commission writes
    pub background: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debit: RetryPolicy::new(3, 5, 50),
            credit: RetryPolicy::new(3, 5, 50),
            compensation: RetryPolicy::new(8, 20, 2_000),
            background: RetryPolicy::new(10, 100, 10_000),
        }
    }
}

/// Collaborators injected into the engine
#[derive(Clone)]
pub struct EnginePorts {
    pub wallets: Arc<dyn WalletStore>,
    pub pins: Arc<dyn PinVault>,
    pub log: Arc<dyn TransactionLog>,
    pub commissions: Arc<dyn CommissionLedger>,
    pub alerts: Arc<dyn AlertSink>,
    pub clock: Arc<dyn Clock>,
}

/// Validated transfer, ready to move money
struct Prepared {
    sender: Account,
    recipient: Account,
    agent: Option<Account>,
    class: TransferClass,
    fee: Decimal,
    total_debit: Decimal,
}

/// Per-execution FSM tracker
struct Flight {
    transaction_id: TransactionId,
    reference: String,
    state: TransferState,
}

impl Flight {
    fn new() -> Self {
        Self {
            transaction_id: TransactionId::new(),
            reference: generate_receipt_reference(),
            state: TransferState::Init,
        }
    }

    fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(
            transaction_id = %self.transaction_id,
            from = %self.state,
            to = %next,
            "Transfer state"
        );
        self.state = next;
    }
}

enum ClaimUpdate {
    Complete(Box<TransferReceipt>),
    Release,
    MarkUnresolved,
}

impl ClaimUpdate {
    fn name(&self) -> &'static str {
        match self {
            ClaimUpdate::Complete(_) => "claim_complete",
            ClaimUpdate::Release => "claim_release",
            ClaimUpdate::MarkUnresolved => "claim_unresolved",
        }
    }
}

pub struct TransferEngine {
    core: Arc<EngineCore>,
}

/// Shared state of the engine, owned by every in-flight transfer task
struct EngineCore {
    wallets: Arc<dyn WalletStore>,
    pins: Arc<dyn PinVault>,
    log: Arc<dyn TransactionLog>,
    commissions: Arc<dyn CommissionLedger>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    fees: FeeCalculator,
    commission_rates: CommissionCalculator,
    config: EngineConfig,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl TransferEngine {
    pub fn new(ports: EnginePorts, schedule: FeeSchedule, config: EngineConfig) -> Self {
        let core = EngineCore {
            wallets: ports.wallets,
            pins: ports.pins,
            log: ports.log,
            commissions: ports.commissions,
            alerts: ports.alerts,
            clock: ports.clock,
            fees: FeeCalculator::new(schedule.clone()),
            commission_rates: CommissionCalculator::new(schedule),
            config,
            background: Mutex::new(Vec::new()),
        };
        Self {
            core: Arc::new(core),
        }
    }

    pub fn fees(&self) -> &FeeCalculator {
        &self.core.fees
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Execute a transfer.
    ///
    /// Repeating a request with the same `client_reference` (for the same
    /// sender) returns the first receipt without moving money again. A blank
    /// reference disables that protection.
    ///
    /// Once the reference is claimed the transfer runs to completion on its
    /// own task; dropping the returned future does not cancel it.
    pub async fn execute(&self, req: TransferRequest) -> Result<TransferReceipt, TransferError> {
        if !is_valid_amount(req.amount) {
            debug!(amount = %req.amount, "Rejected amount");
            return Err(TransferError::AmountInvalid);
        }

        let recipient_number =
            WalletNumber::parse(&req.recipient_wallet_number).map_err(|e| {
                debug!(error = %e, "Rejected wallet number");
                TransferError::WalletFormatInvalid
            })?;

        let key = (!req.client_reference.trim().is_empty())
            .then(|| IdempotencyKey::new(req.sender_account_id, req.client_reference.clone()));

        if let Some(key) = &key {
            match self.core.log.claim(key).await? {
                ReferenceClaim::Claimed => {}
                ReferenceClaim::Completed(receipt) => {
                    info!(
                        idempotency_key = %key,
                        transaction_id = %receipt.transaction_id,
                        "Duplicate reference, returning stored receipt"
                    );
                    return Ok(receipt);
                }
                ReferenceClaim::InFlight => return Err(TransferError::DuplicateRequest),
                ReferenceClaim::Unresolved => return Err(TransferError::CreditFailed),
            }
        }

        let core = self.core.clone();
        let task = tokio::spawn(async move { core.finish(req, recipient_number, key).await });
        task.await.unwrap_or_else(|e| {
            error!(error = %e, "Transfer task did not complete");
            Err(TransferError::ServiceUnavailable(
                "transfer task did not complete".to_string(),
            ))
        })
    }

    /// Read-only recipient lookup shown before PIN entry.
    ///
    /// Malformed, unknown and suspended wallets are reported as not valid.
    pub async fn validate_recipient(
        &self,
        wallet_number: &str,
    ) -> Result<RecipientCheck, TransferError> {
        let Ok(number) = WalletNumber::parse(wallet_number) else {
            return Ok(RecipientCheck::invalid());
        };
        match self.core.wallets.get_by_number(&number).await {
            Ok(Some(account)) if account.is_active() => {
                Ok(RecipientCheck::found(account.owner_name))
            }
            Ok(_) => Ok(RecipientCheck::invalid()),
            Err(e) => {
                warn!(error = %e, "Recipient lookup failed");
                Err(TransferError::ServiceUnavailable(e.to_string()))
            }
        }
    }

    /// Wait for every deferred write spawned so far.
    pub async fn drain_background(&self) {
        loop {
            let handles = std::mem::take(&mut *self.core.lock_background());
            if handles.is_empty() {
                return;
            }
            for result in join_all(handles).await {
                if let Err(e) = result {
                    error!(error = %e, "Background task panicked");
                }
            }
        }
    }
}

impl EngineCore {
    // ========================================================================
    // Steps
    // ========================================================================

    /// Post-claim phase: run the transfer, then settle the claim.
    async fn finish(
        &self,
        req: TransferRequest,
        recipient_number: WalletNumber,
        key: Option<IdempotencyKey>,
    ) -> Result<TransferReceipt, TransferError> {
        let outcome = self.run(&req, &recipient_number).await;

        if let Some(key) = key {
            let update = match &outcome {
                Ok(receipt) => ClaimUpdate::Complete(Box::new(receipt.clone())),
                Err(TransferError::CreditFailed) => ClaimUpdate::MarkUnresolved,
                Err(_) => ClaimUpdate::Release,
            };
            self.settle_claim(key, update).await;
        }

        outcome
    }

    async fn run(
        &self,
        req: &TransferRequest,
        recipient_number: &WalletNumber,
    ) -> Result<TransferReceipt, TransferError> {
        let prepared = self.prepare(req, recipient_number).await?;

        self.pins
            .validate(prepared.sender.owner_id, &req.pin)
            .await
            .inspect_err(|e| {
                info!(
                    sender = %prepared.sender.id,
                    error = %e,
                    "PIN authorization failed"
                )
            })?;

        let mut flight = Flight::new();

        let sender_balance = match self.debit(&prepared).await {
            Ok(balance) => balance,
            Err(e) => {
                flight.advance(TransferState::Failed);
                return Err(e);
            }
        };
        flight.advance(TransferState::Debited);

        let recipient_balance = match self.credit(&prepared, req.amount).await {
            Ok(balance) => balance,
            Err(cause) => {
                flight.advance(TransferState::Compensating);
                return Err(self
                    .compensate(&mut flight, req, &prepared, sender_balance, cause)
                    .await);
            }
        };
        flight.advance(TransferState::Committed);

        let now = self.clock.now();
        let entries = vec![
            self.entry(
                &flight,
                req,
                prepared.sender.id,
                EntryType::TransferDebit,
                -prepared.total_debit,
                sender_balance,
                now,
            ),
            self.entry(
                &flight,
                req,
                prepared.recipient.id,
                EntryType::TransferCredit,
                req.amount,
                recipient_balance,
                now,
            ),
        ];
        self.append_entries(entries).await;

        let commission = match &prepared.agent {
            Some(agent) => self.commission_rates.compute(req.amount, prepared.class).map(|c| {
                (
                    c,
                    CommissionEntry {
                        agent_id: agent.id,
                        base_transaction_id: flight.transaction_id,
                        amount: c.amount,
                        rate: c.rate,
                        created_at: now,
                    },
                )
            }),
            None => None,
        };
        if let Some((_, entry)) = &commission {
            self.credit_commission(entry.clone()).await;
        }

        let receipt = TransferReceipt {
            transaction_id: flight.transaction_id,
            receipt_reference: flight.reference.clone(),
            class: prepared.class,
            sender_account_id: prepared.sender.id,
            recipient_account_id: prepared.recipient.id,
            amount: req.amount,
            fee: prepared.fee,
            total_debit: prepared.total_debit,
            new_sender_balance: sender_balance,
            commission: commission.map(|(c, _)| c),
            created_at: now,
        };

        info!(
            target: AUDIT_TARGET,
            transaction_id = %receipt.transaction_id,
            reference = %receipt.receipt_reference,
            class = %receipt.class,
            sender = %receipt.sender_account_id,
            recipient = %receipt.recipient_account_id,
            amount = %receipt.amount,
            fee = %receipt.fee,
            "Transfer committed"
        );

        Ok(receipt)
    }

    /// Lookups, status checks, fee and funds check. No mutation.
    async fn prepare(
        &self,
        req: &TransferRequest,
        recipient_number: &WalletNumber,
    ) -> Result<Prepared, TransferError> {
        let sender = self
            .wallets
            .get_by_id(req.sender_account_id)
            .await?
            .ok_or(TransferError::AccountNotFound)?;
        let recipient = self
            .wallets
            .get_by_number(recipient_number)
            .await?
            .ok_or(TransferError::AccountNotFound)?;

        if sender.id == recipient.id {
            return Err(TransferError::SelfTransfer);
        }
        if !sender.is_active() || !recipient.is_active() {
            return Err(TransferError::AccountSuspended);
        }

        let agent = match req.agent_id {
            Some(agent_id) => {
                let agent = self
                    .wallets
                    .get_by_id(agent_id)
                    .await?
                    .filter(Account::is_agent)
                    .ok_or(TransferError::AccountNotFound)?;
                if !agent.is_active() {
                    return Err(TransferError::AccountSuspended);
                }
                Some(agent)
            }
            None => None,
        };

        let class = TransferClass::classify(sender.class, recipient.class, agent.is_some());
        let fee = self.fees.compute(req.amount, class);
        let total_debit = req
            .amount
            .checked_add(fee)
            .ok_or(TransferError::AmountInvalid)?;

        if sender.balance < total_debit {
            return Err(TransferError::InsufficientFunds {
                required: total_debit,
                available: sender.balance,
            });
        }

        Ok(Prepared {
            sender,
            recipient,
            agent,
            class,
            fee,
            total_debit,
        })
    }

    /// Debit `total_debit`, re-reading the balance before each retry.
    async fn debit(&self, prepared: &Prepared) -> Result<Decimal, TransferError> {
        let sender_id = prepared.sender.id;
        let total = prepared.total_debit;

        let result = self
            .config
            .debit
            .run(
                "debit",
                |attempt| async move {
                    if attempt > 1 {
                        let current = self
                            .wallets
                            .get_by_id(sender_id)
                            .await?
                            .ok_or(WalletStoreError::NotFound(sender_id))?;
                        if current.balance < total {
                            return Err(WalletStoreError::InsufficientBalance {
                                available: current.balance,
                            });
                        }
                    }
                    self.wallets.atomic_adjust(sender_id, -total).await
                },
                WalletStoreError::is_retryable,
            )
            .await;

        result.map_err(|e| match e {
            WalletStoreError::InsufficientBalance { available } => {
                TransferError::InsufficientFunds {
                    required: total,
                    available,
                }
            }
            WalletStoreError::NotFound(_) => TransferError::AccountNotFound,
            other => {
                warn!(sender = %sender_id, error = %other, "Debit failed");
                TransferError::TransferFailed
            }
        })
    }

    async fn credit(
        &self,
        prepared: &Prepared,
        amount: Decimal,
    ) -> Result<Decimal, WalletStoreError> {
        let recipient_id = prepared.recipient.id;
        self.config
            .credit
            .run(
                "credit",
                |_| self.wallets.atomic_adjust(recipient_id, amount),
                WalletStoreError::is_retryable,
            )
            .await
    }

    /// Return the debit to the sender. Always yields the error to report.
    async fn compensate(
        &self,
        flight: &mut Flight,
        req: &TransferRequest,
        prepared: &Prepared,
        balance_after_debit: Decimal,
        cause: WalletStoreError,
    ) -> TransferError {
        let sender_id = prepared.sender.id;
        let total = prepared.total_debit;
        warn!(
            transaction_id = %flight.transaction_id,
            recipient = %prepared.recipient.id,
            error = %cause,
            "Credit failed, returning debit to sender"
        );

        let refund = self
            .config
            .compensation
            .run(
                "compensate",
                |_| self.wallets.atomic_adjust(sender_id, total),
                |_| true,
            )
            .await;

        let now = self.clock.now();
        let debit_entry = self.entry(
            flight,
            req,
            sender_id,
            EntryType::TransferDebit,
            -total,
            balance_after_debit,
            now,
        );

        match refund {
            Ok(restored) => {
                flight.advance(TransferState::RolledBack);
                let reversal =
                    self.entry(flight, req, sender_id, EntryType::Reversal, total, restored, now);
                self.append_entries(vec![debit_entry, reversal]).await;
                info!(
                    transaction_id = %flight.transaction_id,
                    sender = %sender_id,
                    "Transfer rolled back"
                );
                TransferError::TransferFailed
            }
            Err(e) => {
                flight.advance(TransferState::Unresolved);
                error!(
                    transaction_id = %flight.transaction_id,
                    sender = %sender_id,
                    recipient = %prepared.recipient.id,
                    outstanding = %total,
                    error = %e,
                    "Compensation exhausted, sender debited without credit"
                );
                // The ledger still has to explain where the money went
                self.append_entries(vec![debit_entry]).await;
                self.alerts
                    .raise(InconsistencyAlert {
                        transaction_id: flight.transaction_id,
                        client_reference: req.client_reference.clone(),
                        sender_account_id: sender_id,
                        recipient_account_id: prepared.recipient.id,
                        outstanding: total,
                        reason: format!("credit failed: {cause}; refund failed: {e}"),
                        detected_at: now,
                    })
                    .await;
                TransferError::CreditFailed
            }
        }
    }

    // ========================================================================
    // Deferred writes
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn entry(
        &self,
        flight: &Flight,
        req: &TransferRequest,
        account_id: AccountId,
        entry_type: EntryType,
        delta: Decimal,
        balance_after: Decimal,
        created_at: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry {
            transaction_id: flight.transaction_id,
            account_id,
            entry_type,
            delta,
            balance_after,
            reference: flight.reference.clone(),
            description: req.description.clone(),
            created_at,
        }
    }

    async fn append_entries(&self, entries: Vec<LedgerEntry>) {
        let log = self.log.clone();
        let entries = Arc::new(entries);
        self.write_or_defer("ledger_append", move || {
            let log = log.clone();
            let entries = entries.clone();
            async move { log.append(&entries).await }
        })
        .await;
    }

    async fn credit_commission(&self, entry: CommissionEntry) {
        let ledger = self.commissions.clone();
        self.write_or_defer("commission_credit", move || {
            let ledger = ledger.clone();
            let entry = entry.clone();
            async move {
                let balance = ledger.credit(&entry).await?;
                debug!(
                    agent = %entry.agent_id,
                    amount = %entry.amount,
                    commission_balance = %balance,
                    "Commission credited"
                );
                Ok::<(), LedgerError>(())
            }
        })
        .await;
    }

    async fn settle_claim(&self, key: IdempotencyKey, update: ClaimUpdate) {
        let what = update.name();
        let log = self.log.clone();
        let update = Arc::new(update);
        self.write_or_defer(what, move || {
            let log = log.clone();
            let key = key.clone();
            let update = update.clone();
            async move {
                match update.as_ref() {
                    ClaimUpdate::Complete(receipt) => log.complete(&key, receipt).await,
                    ClaimUpdate::Release => log.release(&key).await,
                    ClaimUpdate::MarkUnresolved => log.mark_unresolved(&key).await,
                }
            }
        })
        .await;
    }

    /// One inline attempt; on failure hand the write to a background task.
    async fn write_or_defer<F, Fut>(&self, what: &'static str, op: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LedgerError>> + Send + 'static,
    {
        let Err(e) = op().await else {
            return;
        };
        warn!(op = what, error = %e, "Write failed, retrying in background");

        let policy = self.config.background;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(policy.delay_for(1)).await;
            match policy.run(what, |_| op(), |_| true).await {
                Ok(()) => info!(op = what, "Deferred write completed"),
                Err(e) => error!(
                    op = what,
                    attempts = policy.max_attempts,
                    error = %e,
                    "Deferred write abandoned"
                ),
            }
        });

        let mut pending = self.lock_background();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn lock_background(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.background.lock().unwrap_or_else(|e| e.into_inner())
    }
}
