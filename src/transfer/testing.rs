//! Fault-injecting fakes and a ready-made engine harness for tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::engine::{EngineConfig, EnginePorts, TransferEngine};
use super::retry::RetryPolicy;
use super::types::TransferReceipt;
use crate::alert::CollectingAlertSink;
use crate::clock::ManualClock;
use crate::fee::FeeSchedule;
use crate::ledger::{
    CommissionEntry, CommissionLedger, IdempotencyKey, InMemoryCommissionLedger,
    InMemoryTransactionLog, LedgerEntry, LedgerError, ReferenceClaim, TransactionId,
    TransactionLog,
};
use crate::pin::{ArgonPinVault, LockoutPolicy, PinHashParams, PinVault};
use crate::wallet::{
    Account, AccountId, InMemoryWalletStore, OwnerId, WalletNumber, WalletStore, WalletStoreError,
};

/// Take one unit from a failure budget. Returns true if the call should fail.
fn consume(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ============================================================================
// WalletStore
// ============================================================================

pub struct FlakyWalletStore {
    pub inner: InMemoryWalletStore,
    /// Next N debits lose a race
    debit_conflicts: AtomicU32,
    /// Credits to these accounts fail as unavailable
    failing_credits: Mutex<HashSet<AccountId>>,
    reads_unavailable: Mutex<bool>,
    /// Every credit sleeps this long before applying
    credit_delay: Mutex<Option<Duration>>,
    adjust_count: AtomicUsize,
}

impl FlakyWalletStore {
    pub fn new(inner: InMemoryWalletStore) -> Self {
        Self {
            inner,
            debit_conflicts: AtomicU32::new(0),
            failing_credits: Mutex::new(HashSet::new()),
            reads_unavailable: Mutex::new(false),
            credit_delay: Mutex::new(None),
            adjust_count: AtomicUsize::new(0),
        }
    }

    pub fn set_debit_conflicts(&self, n: u32) {
        self.debit_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn fail_credits_to(&self, id: AccountId) {
        self.failing_credits.lock().unwrap().insert(id);
    }

    pub fn heal_credits(&self) {
        self.failing_credits.lock().unwrap().clear();
    }

    pub fn set_reads_unavailable(&self, unavailable: bool) {
        *self.reads_unavailable.lock().unwrap() = unavailable;
    }

    pub fn set_credit_delay(&self, delay: Duration) {
        *self.credit_delay.lock().unwrap() = Some(delay);
    }

    pub fn adjust_count(&self) -> usize {
        self.adjust_count.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<(), WalletStoreError> {
        if *self.reads_unavailable.lock().unwrap() {
            Err(WalletStoreError::Unavailable("injected read outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WalletStore for FlakyWalletStore {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, WalletStoreError> {
        self.check_reads()?;
        self.inner.get_by_id(id).await
    }

    async fn get_by_number(
        &self,
        number: &WalletNumber,
    ) -> Result<Option<Account>, WalletStoreError> {
        self.check_reads()?;
        self.inner.get_by_number(number).await
    }

    async fn atomic_adjust(
        &self,
        id: AccountId,
        delta: Decimal,
    ) -> Result<Decimal, WalletStoreError> {
        self.adjust_count.fetch_add(1, Ordering::SeqCst);
        if delta < Decimal::ZERO && consume(&self.debit_conflicts) {
            return Err(WalletStoreError::ConcurrencyConflict);
        }
        let delay = *self.credit_delay.lock().unwrap();
        if let (true, Some(delay)) = (delta > Decimal::ZERO, delay) {
            tokio::time::sleep(delay).await;
        }
        if delta > Decimal::ZERO && self.failing_credits.lock().unwrap().contains(&id) {
            return Err(WalletStoreError::Unavailable("injected credit failure".into()));
        }
        self.inner.atomic_adjust(id, delta).await
    }
}

// ============================================================================
// TransactionLog
// ============================================================================

#[derive(Default)]
pub struct FlakyTransactionLog {
    pub inner: InMemoryTransactionLog,
    append_failures: AtomicU32,
    claims_unavailable: Mutex<bool>,
    append_calls: AtomicUsize,
}

impl FlakyTransactionLog {
    pub fn set_append_failures(&self, n: u32) {
        self.append_failures.store(n, Ordering::SeqCst);
    }

    pub fn set_claims_unavailable(&self, unavailable: bool) {
        *self.claims_unavailable.lock().unwrap() = unavailable;
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionLog for FlakyTransactionLog {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ReferenceClaim, LedgerError> {
        if *self.claims_unavailable.lock().unwrap() {
            return Err(LedgerError::Unavailable("injected log outage".into()));
        }
        self.inner.claim(key).await
    }

    async fn complete(
        &self,
        key: &IdempotencyKey,
        receipt: &TransferReceipt,
    ) -> Result<(), LedgerError> {
        self.inner.complete(key, receipt).await
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), LedgerError> {
        self.inner.release(key).await
    }

    async fn mark_unresolved(&self, key: &IdempotencyKey) -> Result<(), LedgerError> {
        self.inner.mark_unresolved(key).await
    }

    async fn append(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if consume(&self.append_failures) {
            return Err(LedgerError::WriteFailed("injected append failure".into()));
        }
        self.inner.append(entries).await
    }

    async fn entries_for(&self, tx: TransactionId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.inner.entries_for(tx).await
    }

    async fn entries_for_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.inner.entries_for_account(account).await
    }
}

// ============================================================================
// CommissionLedger
// ============================================================================

#[derive(Default)]
pub struct FlakyCommissionLedger {
    pub inner: InMemoryCommissionLedger,
    credit_failures: AtomicU32,
}

impl FlakyCommissionLedger {
    pub fn set_credit_failures(&self, n: u32) {
        self.credit_failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl CommissionLedger for FlakyCommissionLedger {
    async fn credit(&self, entry: &CommissionEntry) -> Result<Decimal, LedgerError> {
        if consume(&self.credit_failures) {
            return Err(LedgerError::Unavailable("injected commission outage".into()));
        }
        self.inner.credit(entry).await
    }

    async fn balance(&self, agent: AccountId) -> Result<Decimal, LedgerError> {
        self.inner.balance(agent).await
    }

    async fn entries_for(&self, agent: AccountId) -> Result<Vec<CommissionEntry>, LedgerError> {
        self.inner.entries_for(agent).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub const ALICE: AccountId = AccountId(1);
pub const BOB: AccountId = AccountId(2);
pub const SHOP: AccountId = AccountId(3);
pub const ALICE_PIN: &str = "1234";
pub const SHOP_PIN: &str = "3333";

/// Engine wired to flaky fakes with no retry delays.
///
/// Accounts: Alice `WLT88800001` (1000.00), Bob `WLT88800002` (0.00),
/// agent Corner Shop `AGT88800003` (5000.00).
pub struct TestHarness {
    pub engine: TransferEngine,
    pub wallets: Arc<FlakyWalletStore>,
    pub pins: Arc<ArgonPinVault>,
    pub log: Arc<FlakyTransactionLog>,
    pub commissions: Arc<FlakyCommissionLedger>,
    pub alerts: Arc<CollectingAlertSink>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig {
            debit: RetryPolicy::immediate(3),
            credit: RetryPolicy::immediate(2),
            compensation: RetryPolicy::immediate(3),
            background: RetryPolicy::immediate(5),
        })
        .await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let store = InMemoryWalletStore::new();
        for (id, number, owner, name, balance) in [
            (ALICE, "WLT88800001", 101, "Alice", Decimal::new(100_000, 2)),
            (BOB, "WLT88800002", 102, "Bob", Decimal::ZERO),
            (SHOP, "AGT88800003", 103, "Corner Shop", Decimal::new(500_000, 2)),
        ] {
            store
                .insert(Account::new(
                    id,
                    WalletNumber::parse(number).unwrap(),
                    OwnerId(owner),
                    name,
                    balance,
                ))
                .unwrap();
        }

        let clock = Arc::new(ManualClock::default());
        let pins = Arc::new(
            ArgonPinVault::new(LockoutPolicy::default(), PinHashParams::fast(), clock.clone())
                .unwrap(),
        );
        pins.set_pin(OwnerId(101), ALICE_PIN).await.unwrap();
        pins.set_pin(OwnerId(102), "2222").await.unwrap();
        pins.set_pin(OwnerId(103), SHOP_PIN).await.unwrap();

        let wallets = Arc::new(FlakyWalletStore::new(store));
        let log = Arc::new(FlakyTransactionLog::default());
        let commissions = Arc::new(FlakyCommissionLedger::default());
        let alerts = Arc::new(CollectingAlertSink::new());

        let engine = TransferEngine::new(
            EnginePorts {
                wallets: wallets.clone(),
                pins: pins.clone(),
                log: log.clone(),
                commissions: commissions.clone(),
                alerts: alerts.clone(),
                clock: clock.clone(),
            },
            FeeSchedule::standard(),
            config,
        );

        Self {
            engine,
            wallets,
            pins,
            log,
            commissions,
            alerts,
            clock,
        }
    }

    pub fn balance(&self, id: AccountId) -> Decimal {
        self.wallets.inner.balance_of(id).unwrap()
    }

    pub fn total(&self) -> Decimal {
        self.wallets.inner.total_balance()
    }
}
