//! Pre-built Test Fixtures
//!
//! Ready-to-use values for the tariff test suites. Amounts are in Rials
//! unless stated otherwise; dates sit inside the Iranian year 1403.

use chrono::NaiveDate;
use core_kernel::{
    Currency, InsurancePlanId, Money, Percentage, PatientId, RuleId, ServiceCategoryId, ServiceId,
    SupplementaryPlanId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A typical specialist visit tariff
    pub fn visit_fee() -> Money {
        Money::new(dec!(1000000), Currency::IRR)
    }

    /// A tariff above the usual payment ceilings
    pub fn surgery_fee() -> Money {
        Money::new(dec!(15000000), Currency::IRR)
    }

    pub fn deductible() -> Money {
        Money::new(dec!(100000), Currency::IRR)
    }

    pub fn irr(amount: Decimal) -> Money {
        Money::new(amount, Currency::IRR)
    }

    pub fn irr_zero() -> Money {
        Money::zero(Currency::IRR)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for percentages
pub struct PercentFixtures;

impl PercentFixtures {
    pub fn of(value: Decimal) -> Percentage {
        Percentage::saturating(value)
    }

    pub fn primary_coverage() -> Percentage {
        Percentage::saturating(dec!(80))
    }

    pub fn supplementary_coverage() -> Percentage {
        Percentage::saturating(dec!(50))
    }
}

/// Fixture for calendar days
pub struct DateFixtures;

impl DateFixtures {
    /// 1 Farvardin 1403
    pub fn year_start() -> NaiveDate {
        date(2024, 3, 20)
    }

    /// The default calculation date of the builders
    pub fn calculation_day() -> NaiveDate {
        date(2024, 6, 15)
    }

    /// 29 Esfand 1403
    pub fn year_end() -> NaiveDate {
        date(2025, 3, 19)
    }

    pub fn after_year_end() -> NaiveDate {
        date(2025, 4, 1)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Fixture for stable identifiers
///
/// Fixed UUIDs keep rule ordering and JSON fixtures reproducible.
pub struct IdFixtures;

impl IdFixtures {
    pub fn plan_id() -> InsurancePlanId {
        InsurancePlanId::from_uuid(Uuid::from_u128(0x1001))
    }

    pub fn other_plan_id() -> InsurancePlanId {
        InsurancePlanId::from_uuid(Uuid::from_u128(0x1002))
    }

    pub fn category_id() -> ServiceCategoryId {
        ServiceCategoryId::from_uuid(Uuid::from_u128(0x2001))
    }

    pub fn other_category_id() -> ServiceCategoryId {
        ServiceCategoryId::from_uuid(Uuid::from_u128(0x2002))
    }

    pub fn service_id() -> ServiceId {
        ServiceId::from_uuid(Uuid::from_u128(0x3001))
    }

    pub fn patient_id() -> PatientId {
        PatientId::from_uuid(Uuid::from_u128(0x4001))
    }

    pub fn supplementary_plan_id() -> SupplementaryPlanId {
        SupplementaryPlanId::from_uuid(Uuid::from_u128(0x5001))
    }

    /// Rule ids ordered by `n`
    pub fn rule_id(n: u128) -> RuleId {
        RuleId::from_uuid(Uuid::from_u128(0x9000 + n))
    }
}

/// Fixture for persisted rule payloads
pub struct RuleJsonFixtures;

impl RuleJsonFixtures {
    pub fn no_conditions() -> &'static str {
        "[]"
    }

    pub fn seniors() -> &'static str {
        r#"[{"field": "patient_age", "operator": "greater_than_or_equal", "value": 65}]"#
    }

    pub fn children() -> &'static str {
        r#"[{"field": "patient_age", "operator": "less_than", "value": 12}]"#
    }

    pub fn women() -> &'static str {
        r#"[{"field": "patient_gender", "operator": "equals", "value": "female"}]"#
    }

    pub fn coverage(percent: u32) -> String {
        format!(r#"[{{"type": "coverage_percent", "value": {}}}]"#, percent)
    }

    pub fn deductible(amount: u64) -> String {
        format!(r#"[{{"type": "deductible", "value": {}}}]"#, amount)
    }

    pub fn discount(percent: u32) -> String {
        format!(r#"[{{"type": "discount_percent", "value": {}}}]"#, percent)
    }

    pub fn max_insurer_payment(amount: u64) -> String {
        format!(r#"[{{"type": "max_insurer_payment", "value": {}}}]"#, amount)
    }

    pub fn max_patient_payment(amount: u64) -> String {
        format!(r#"[{{"type": "max_patient_payment", "value": {}}}]"#, amount)
    }

    /// Payload that is not JSON at all
    pub fn malformed() -> &'static str {
        r#"[{"type": "coverage_percent", "value": "#
    }
}
