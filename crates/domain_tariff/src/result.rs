//! Outcome of one share calculation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CalculationId, Money};

use crate::rules::{AppliedRule, SkippedRule};
use crate::share::{ShareBreakdown, ShareError};

/// Why a result is invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidTariffPrice,
    InvalidPercentage,
    InvalidInput,
    PaymentLimitExceeded,
}

impl From<&ShareError> for FailureKind {
    fn from(error: &ShareError) -> Self {
        match error {
            ShareError::InvalidTariffPrice(_) => FailureKind::InvalidTariffPrice,
            ShareError::InvalidPercentage { .. } | ShareError::PercentageSumExceeded { .. } => {
                FailureKind::InvalidPercentage
            }
            ShareError::InvalidDeductible(_)
            | ShareError::InvalidPaymentCeiling(_)
            | ShareError::Money(_) => FailureKind::InvalidInput,
        }
    }
}

/// Patient / insurer split of one service line
///
/// When `is_valid` is true, `patient_share + insurer_share == tariff_price`
/// exactly and both percentages lie in `0..=100`. When it is false the
/// shares are zero and `error_message` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareResult {
    pub calculation_id: CalculationId,
    /// Price before discount
    pub original_price: Money,
    pub discount_amount: Money,
    /// Price after discount, the amount that is split
    pub tariff_price: Money,
    pub patient_share: Money,
    pub insurer_share: Money,
    pub patient_share_percent: Decimal,
    pub insurer_share_percent: Decimal,
    pub supplementary_percent_of_total: Option<Decimal>,
    pub supplementary_amount: Money,
    pub is_valid: bool,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub applied_rules: Vec<AppliedRule>,
    pub skipped_rules: Vec<SkippedRule>,
}

impl ShareResult {
    pub(crate) fn from_breakdown(
        calculation_id: CalculationId,
        original_price: Money,
        discount_amount: Money,
        breakdown: ShareBreakdown,
    ) -> Self {
        Self {
            calculation_id,
            original_price,
            discount_amount,
            tariff_price: breakdown.tariff_price,
            patient_share: breakdown.patient_share,
            insurer_share: breakdown.insurer_share,
            patient_share_percent: breakdown.patient_percent,
            insurer_share_percent: breakdown.insurer_percent,
            supplementary_percent_of_total: breakdown.supplementary_percent_of_total,
            supplementary_amount: breakdown.supplementary_amount,
            is_valid: true,
            error_message: None,
            failure_kind: None,
            applied_rules: Vec::new(),
            skipped_rules: Vec::new(),
        }
    }

    /// A discount that leaves nothing to pay
    pub(crate) fn fully_discounted(
        calculation_id: CalculationId,
        original_price: Money,
        discount_amount: Money,
    ) -> Self {
        let zero = Money::zero(original_price.currency());
        Self {
            calculation_id,
            original_price,
            discount_amount,
            tariff_price: zero,
            patient_share: zero,
            insurer_share: zero,
            patient_share_percent: Decimal::ZERO,
            insurer_share_percent: Decimal::ZERO,
            supplementary_percent_of_total: None,
            supplementary_amount: zero,
            is_valid: true,
            error_message: None,
            failure_kind: None,
            applied_rules: Vec::new(),
            skipped_rules: Vec::new(),
        }
    }

    pub(crate) fn invalid(
        calculation_id: CalculationId,
        original_price: Money,
        discount_amount: Money,
        tariff_price: Money,
        kind: FailureKind,
        message: String,
    ) -> Self {
        let zero = Money::zero(original_price.currency());
        Self {
            calculation_id,
            original_price,
            discount_amount,
            tariff_price,
            patient_share: zero,
            insurer_share: zero,
            patient_share_percent: Decimal::ZERO,
            insurer_share_percent: Decimal::ZERO,
            supplementary_percent_of_total: None,
            supplementary_amount: zero,
            is_valid: false,
            error_message: Some(message),
            failure_kind: Some(kind),
            applied_rules: Vec::new(),
            skipped_rules: Vec::new(),
        }
    }

    /// Total of both shares
    pub fn reconciled_total(&self) -> Decimal {
        self.patient_share.amount() + self.insurer_share.amount()
    }
}
