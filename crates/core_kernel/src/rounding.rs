//! Rounding policy for currency amounts and reported percentages
//!
//! The policy is a plain value that callers inject wherever rounding happens.
//! The default matches clinic billing practice: whole currency units and
//! percentages with two fractional digits, both rounded half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::{Currency, Money};

/// How a midpoint (or any excess precision) is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 0.5 -> 1, -0.5 -> -1, 2.5 -> 3
    #[default]
    HalfAwayFromZero,
    /// Banker's rounding: 0.5 -> 0, 2.5 -> 2
    HalfEven,
    /// Truncate excess digits
    TowardZero,
    /// Any excess digit rounds away from zero
    AwayFromZero,
}

impl RoundingMode {
    fn strategy(&self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfAwayFromZero => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::TowardZero => RoundingStrategy::ToZero,
            RoundingMode::AwayFromZero => RoundingStrategy::AwayFromZero,
        }
    }
}

impl FromStr for RoundingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half_away_from_zero" => Ok(RoundingMode::HalfAwayFromZero),
            "half_even" | "bankers" => Ok(RoundingMode::HalfEven),
            "toward_zero" | "truncate" => Ok(RoundingMode::TowardZero),
            "away_from_zero" => Ok(RoundingMode::AwayFromZero),
            other => Err(CoreError::Configuration(format!(
                "unknown rounding mode '{}'",
                other
            ))),
        }
    }
}

/// Currency and percentage rounding rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    /// Decimal places kept on currency amounts
    pub currency_decimal_places: u32,
    /// Decimal places kept on reported percentages
    pub percentage_decimal_places: u32,
    /// Rounding rule applied to both
    pub mode: RoundingMode,
}

impl RoundingPolicy {
    /// Creates a policy with explicit precisions
    pub fn new(currency_decimal_places: u32, percentage_decimal_places: u32, mode: RoundingMode) -> Self {
        Self {
            currency_decimal_places,
            percentage_decimal_places,
            mode,
        }
    }

    /// Creates the default policy adjusted to a currency's minor-unit precision
    pub fn for_currency(currency: Currency) -> Self {
        Self {
            currency_decimal_places: currency.decimal_places(),
            ..Self::default()
        }
    }

    /// Decimal places actually applied to amounts, never finer than `Money` stores
    pub fn effective_currency_places(&self) -> u32 {
        self.currency_decimal_places.min(Money::SCALE)
    }

    /// Rounds an amount to currency precision
    pub fn round_currency(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.effective_currency_places(), self.mode.strategy())
    }

    /// Rounds a percentage to reporting precision
    pub fn round_percentage(&self, percentage: Decimal) -> Decimal {
        percentage.round_dp_with_strategy(self.percentage_decimal_places, self.mode.strategy())
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            currency_decimal_places: 0,
            percentage_decimal_places: 2,
            mode: RoundingMode::HalfAwayFromZero,
        }
    }
}
