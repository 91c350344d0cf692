//! Patient / insurer share calculation
//!
//! Splits one tariff price between the patient and the insurer. Every split
//! is reconciled by subtraction: the insurer side is rounded once and the
//! patient side is whatever remains of the (already rounded) price, so the
//! two shares always add back up to the price exactly.
//!
//! Two modes exist:
//!
//! - **Manual**: reception typed the percentages in by hand.
//! - **Automatic**: deductible first, then the primary coverage, then the
//!   supplementary plan's share of whatever the primary insurer left unpaid.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use core_kernel::{Currency, Money, MoneyError, RoundingPolicy};

/// Errors raised for share inputs that cannot produce a valid split
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("Tariff price must be greater than zero, got {0}")]
    InvalidTariffPrice(Money),

    #[error("{field} must lie within 0..=100, got {value}")]
    InvalidPercentage { field: &'static str, value: Decimal },

    #[error("Patient and insurer percentages add up to {sum}, more than 100")]
    PercentageSumExceeded {
        patient: Decimal,
        insurer: Decimal,
        sum: Decimal,
    },

    #[error("Deductible must not be negative, got {0}")]
    InvalidDeductible(Money),

    #[error("Supplementary payment ceiling must not be negative, got {0}")]
    InvalidPaymentCeiling(Money),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Percentages entered by reception staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualShareRequest {
    pub tariff_price: Money,
    pub patient_percent: Decimal,
    pub insurer_percent: Decimal,
}

/// Coverage parameters produced by the plan and the rule engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticShareRequest {
    pub tariff_price: Money,
    pub deductible: Money,
    pub primary_coverage_percent: Decimal,
    pub supplementary_coverage_percent: Decimal,
    pub supplementary_max_payment: Option<Money>,
}

/// Input of the calculator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShareRequest {
    Manual(ManualShareRequest),
    Automatic(AutomaticShareRequest),
}

impl ShareRequest {
    pub fn tariff_price(&self) -> Money {
        match self {
            ShareRequest::Manual(r) => r.tariff_price,
            ShareRequest::Automatic(r) => r.tariff_price,
        }
    }
}

/// Which mode produced a breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
    Manual,
    Automatic,
}

/// A reconciled split, with the intermediates kept for auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareBreakdown {
    pub mode: ShareMode,
    /// Price at currency precision
    pub tariff_price: Money,
    pub patient_share: Money,
    pub insurer_share: Money,
    pub patient_percent: Decimal,
    pub insurer_percent: Decimal,
    /// Part of the price paid by the supplementary plan, in percent
    pub supplementary_percent_of_total: Option<Decimal>,
    /// Price minus deductible, floored at zero
    pub coverable_amount: Money,
    /// Primary insurer's rounded share of the coverable amount
    pub insurer_base: Money,
    pub remaining_after_primary: Money,
    /// Supplementary plan's rounded share, after its ceiling
    pub supplementary_amount: Money,
}

/// Pure share calculator; the rounding policy is the only configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareCalculator {
    policy: RoundingPolicy,
}

impl ShareCalculator {
    pub fn new(policy: RoundingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoundingPolicy {
        &self.policy
    }

    /// Computes the split for either mode
    pub fn calculate(&self, request: &ShareRequest) -> Result<ShareBreakdown, ShareError> {
        match request {
            ShareRequest::Manual(manual) => self.calculate_manual(manual),
            ShareRequest::Automatic(automatic) => self.calculate_automatic(automatic),
        }
    }

    /// Manual mode: round the insurer side, derive the patient side
    pub fn calculate_manual(&self, request: &ManualShareRequest) -> Result<ShareBreakdown, ShareError> {
        let currency = request.tariff_price.currency();
        let price = self.rounded_price(&request.tariff_price)?;

        check_percentage("patient_percent", request.patient_percent)?;
        check_percentage("insurer_percent", request.insurer_percent)?;
        let sum = request.patient_percent + request.insurer_percent;
        if sum > Decimal::ONE_HUNDRED {
            return Err(ShareError::PercentageSumExceeded {
                patient: request.patient_percent,
                insurer: request.insurer_percent,
                sum,
            });
        }

        let insurer = self.share_of(price, request.insurer_percent)?;
        let patient = price - insurer;

        let insurer_percent = self.percent_of(insurer, price);
        let patient_percent = Decimal::ONE_HUNDRED - insurer_percent;

        debug!(
            price = %price,
            insurer = %insurer,
            patient = %patient,
            "Manual share calculated"
        );

        let money = |amount: Decimal| Money::new(amount, currency);
        Ok(ShareBreakdown {
            mode: ShareMode::Manual,
            tariff_price: money(price),
            patient_share: money(patient),
            insurer_share: money(insurer),
            patient_percent,
            insurer_percent,
            supplementary_percent_of_total: None,
            coverable_amount: money(price),
            insurer_base: money(insurer),
            remaining_after_primary: money(patient),
            supplementary_amount: Money::zero(currency),
        })
    }

    /// Automatic mode: deductible, primary coverage, then supplementary
    pub fn calculate_automatic(
        &self,
        request: &AutomaticShareRequest,
    ) -> Result<ShareBreakdown, ShareError> {
        let currency = request.tariff_price.currency();
        let price = self.rounded_price(&request.tariff_price)?;

        ensure_currency(currency, &request.deductible)?;
        if request.deductible.is_negative() {
            return Err(ShareError::InvalidDeductible(request.deductible));
        }
        check_percentage("primary_coverage_percent", request.primary_coverage_percent)?;
        check_percentage(
            "supplementary_coverage_percent",
            request.supplementary_coverage_percent,
        )?;
        let ceiling = match request.supplementary_max_payment {
            Some(max) => {
                ensure_currency(currency, &max)?;
                if max.is_negative() {
                    return Err(ShareError::InvalidPaymentCeiling(max));
                }
                Some(self.policy.round_currency(max.amount()))
            }
            None => None,
        };

        let deductible = self.policy.round_currency(request.deductible.amount());
        let coverable = (price - deductible).max(Decimal::ZERO);
        let insurer_base = self.share_of(coverable, request.primary_coverage_percent)?;
        let remaining_after_primary = (price - insurer_base).max(Decimal::ZERO);

        let mut supplementary =
            self.share_of(remaining_after_primary, request.supplementary_coverage_percent)?;
        if let Some(ceiling) = ceiling {
            supplementary = supplementary.min(ceiling);
        }

        let insurer = insurer_base
            .checked_add(supplementary)
            .ok_or(MoneyError::Overflow)?
            .min(price);
        let patient = price - insurer;

        let insurer_percent = self.percent_of(insurer, price);
        let patient_percent = Decimal::ONE_HUNDRED - insurer_percent;
        let supplementary_percent_of_total = if request.supplementary_coverage_percent.is_zero() {
            None
        } else {
            Some(self.percent_of(supplementary, price))
        };

        debug!(
            price = %price,
            deductible = %deductible,
            insurer_base = %insurer_base,
            supplementary = %supplementary,
            insurer = %insurer,
            patient = %patient,
            "Automatic share calculated"
        );

        let money = |amount: Decimal| Money::new(amount, currency);
        Ok(ShareBreakdown {
            mode: ShareMode::Automatic,
            tariff_price: money(price),
            patient_share: money(patient),
            insurer_share: money(insurer),
            patient_percent,
            insurer_percent,
            supplementary_percent_of_total,
            coverable_amount: money(coverable),
            insurer_base: money(insurer_base),
            remaining_after_primary: money(remaining_after_primary),
            supplementary_amount: money(supplementary),
        })
    }

    fn rounded_price(&self, tariff_price: &Money) -> Result<Decimal, ShareError> {
        let price = self.policy.round_currency(tariff_price.amount());
        if price <= Decimal::ZERO {
            return Err(ShareError::InvalidTariffPrice(*tariff_price));
        }
        Ok(price)
    }

    /// Rounded `percent` of `amount`
    fn share_of(&self, amount: Decimal, percent: Decimal) -> Result<Decimal, ShareError> {
        let scaled = amount.checked_mul(percent).ok_or(MoneyError::Overflow)?;
        Ok(self.policy.round_currency(scaled / Decimal::ONE_HUNDRED))
    }

    fn percent_of(&self, part: Decimal, price: Decimal) -> Decimal {
        self.policy
            .round_percentage(part / price * Decimal::ONE_HUNDRED)
    }
}

fn check_percentage(field: &'static str, value: Decimal) -> Result<(), ShareError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ShareError::InvalidPercentage { field, value });
    }
    Ok(())
}

fn ensure_currency(expected: Currency, other: &Money) -> Result<(), ShareError> {
    if other.currency() != expected {
        return Err(MoneyError::CurrencyMismatch(
            expected.to_string(),
            other.currency().to_string(),
        )
        .into());
    }
    Ok(())
}
