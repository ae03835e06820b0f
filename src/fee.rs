//! Fee and commission calculation
//!
//! Fees are `clamp(round(amount * rate), min_fee, max_fee)` with the rate and
//! bounds selected by [`TransferClass`]. Commissions are an unbounded
//! percentage of the transfer amount credited to the facilitating agent.
//! Everything here is pure and deterministic.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::apply_rate;
use crate::wallet::AccountClass;

/// Closed set of transfer classes. Each class owns one row of the
/// [`FeeSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferClass {
    /// User wallet to user wallet
    UserTransfer,
    /// Agent-initiated cash-out: user wallet to agent float
    AgentWithdrawal,
    /// Agent-initiated cash-in: agent float to user wallet
    AgentDeposit,
    /// Any other movement with an agent on either side
    AgentTransfer,
}

impl TransferClass {
    /// Derive the class from the account classes of both parties and whether
    /// an agent facilitates the transfer.
    pub fn classify(sender: AccountClass, recipient: AccountClass, agent_assisted: bool) -> Self {
        match (sender, recipient, agent_assisted) {
            (AccountClass::User, AccountClass::User, _) => TransferClass::UserTransfer,
            (AccountClass::User, AccountClass::Agent, true) => TransferClass::AgentWithdrawal,
            (AccountClass::Agent, AccountClass::User, true) => TransferClass::AgentDeposit,
            _ => TransferClass::AgentTransfer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferClass::UserTransfer => "USER_TRANSFER",
            TransferClass::AgentWithdrawal => "AGENT_WITHDRAWAL",
            TransferClass::AgentDeposit => "AGENT_DEPOSIT",
            TransferClass::AgentTransfer => "AGENT_TRANSFER",
        }
    }

    pub const ALL: [TransferClass; 4] = [
        TransferClass::UserTransfer,
        TransferClass::AgentWithdrawal,
        TransferClass::AgentDeposit,
        TransferClass::AgentTransfer,
    ];
}

impl fmt::Display for TransferClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the fee table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    /// Fee rate as a fraction (0.005 = 0.5%)
    pub rate: Decimal,
    pub min_fee: Decimal,
    pub max_fee: Decimal,
    /// Agent commission as a fraction of the amount, if any
    #[serde(default)]
    pub commission_rate: Option<Decimal>,
}

impl FeeRule {
    fn new(rate: Decimal, min_fee: Decimal, max_fee: Decimal) -> Self {
        Self {
            rate,
            min_fee,
            max_fee,
            commission_rate: None,
        }
    }

    fn with_commission(mut self, rate: Decimal) -> Self {
        self.commission_rate = Some(rate);
        self
    }
}

/// Parameterized fee/commission table, one [`FeeRule`] per [`TransferClass`].
///
/// Missing rows deserialize to the standard values, so configuration can
/// override single classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub user_transfer: FeeRule,
    pub agent_withdrawal: FeeRule,
    pub agent_deposit: FeeRule,
    pub agent_transfer: FeeRule,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl FeeSchedule {
    /// Per-class constants used in production.
    pub fn standard() -> Self {
        // 0.5% in [5, 50]
        let p2p = FeeRule::new(Decimal::new(5, 3), Decimal::from(5), Decimal::from(50));
        // 1.5% in [50, 100]
        let cash = FeeRule::new(Decimal::new(15, 3), Decimal::from(50), Decimal::from(100));

        Self {
            user_transfer: p2p,
            agent_withdrawal: cash.with_commission(Decimal::new(1, 2)),
            agent_deposit: cash.with_commission(Decimal::new(2, 2)),
            agent_transfer: p2p.with_commission(Decimal::new(1, 2)),
        }
    }

    pub fn rule(&self, class: TransferClass) -> &FeeRule {
        match class {
            TransferClass::UserTransfer => &self.user_transfer,
            TransferClass::AgentWithdrawal => &self.agent_withdrawal,
            TransferClass::AgentDeposit => &self.agent_deposit,
            TransferClass::AgentTransfer => &self.agent_transfer,
        }
    }

    /// Reject tables that would break fee bounds or produce negative values.
    pub fn validate(&self) -> Result<(), String> {
        for class in TransferClass::ALL {
            let rule = self.rule(class);
            if rule.rate < Decimal::ZERO || rule.min_fee < Decimal::ZERO {
                return Err(format!("{}: negative rate or minimum fee", class));
            }
            if rule.min_fee > rule.max_fee {
                return Err(format!("{}: min_fee exceeds max_fee", class));
            }
            if matches!(rule.commission_rate, Some(r) if r < Decimal::ZERO) {
                return Err(format!("{}: negative commission rate", class));
            }
        }
        Ok(())
    }
}

/// Transfer fee calculator.
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// Fee charged to the sender on top of `amount`.
    ///
    /// # Example
    /// ```
    /// use rust_decimal::Decimal;
    /// use wallet_ledger::fee::{FeeCalculator, TransferClass};
    ///
    /// let fees = FeeCalculator::default();
    /// // 500 * 0.5% = 2.50, clamped up to the 5.00 minimum
    /// let fee = fees.compute(Decimal::from(500), TransferClass::UserTransfer);
    /// assert_eq!(fee, Decimal::from(5));
    /// ```
    pub fn compute(&self, amount: Decimal, class: TransferClass) -> Decimal {
        let rule = self.schedule.rule(class);
        apply_rate(amount, rule.rate).clamp(rule.min_fee, rule.max_fee)
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }
}

/// Agent commission calculator, backed by the same table.
#[derive(Debug, Clone, Default)]
pub struct CommissionCalculator {
    schedule: FeeSchedule,
}

/// Result of a commission computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub amount: Decimal,
    /// Rate as a fraction (0.01 = 1%)
    pub rate: Decimal,
}

impl CommissionCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// `None` when the class pays no commission or the rounded value is zero.
    pub fn compute(&self, amount: Decimal, class: TransferClass) -> Option<Commission> {
        let rate = self.schedule.rule(class).commission_rate?;
        let value = apply_rate(amount, rate);
        (value > Decimal::ZERO).then_some(Commission {
            amount: value,
            rate,
        })
    }
}
