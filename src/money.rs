//! Money Helpers
//!
//! All balances, amounts, fees and commissions are `rust_decimal::Decimal`
//! values in the wallet currency with [`MONEY_DECIMALS`] fractional digits.
//! Every rounding in the crate goes through this module so that debit and
//! credit sides can never drift apart.

use rust_decimal::prelude::*;

/// Fractional digits carried by every monetary value (minor unit = 0.01).
pub const MONEY_DECIMALS: u32 = 2;

/// Round a computed value (fee, commission) to the minor unit.
///
/// Midpoints round away from zero, which keeps fee functions monotone.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// A transfer amount is valid when strictly positive and representable in
/// minor units without rounding.
#[inline]
pub fn is_valid_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount.normalize().scale() <= MONEY_DECIMALS
}

/// Apply a percentage expressed as a fraction (`0.005` = 0.5%).
///
/// Saturates at `Decimal::MAX`; callers clamp or reject from there.
#[inline]
pub fn apply_rate(amount: Decimal, rate: Decimal) -> Decimal {
    amount
        .checked_mul(rate)
        .map(round_money)
        .unwrap_or(Decimal::MAX)
}

/// Render a value with exactly [`MONEY_DECIMALS`] digits for user-facing text.
pub fn format_money(value: Decimal) -> String {
    let mut v = round_money(value);
    v.rescale(MONEY_DECIMALS);
    v.to_string()
}
