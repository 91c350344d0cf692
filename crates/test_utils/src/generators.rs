//! Property-Based Test Generators
//!
//! Proptest strategies producing share inputs that respect the calculator's
//! preconditions, plus the occasional out-of-range value for rejection tests.

use core_kernel::{Currency, Money, Percentage, RoundingMode, RoundingPolicy};
use domain_tariff::{AutomaticShareRequest, Gender, ManualShareRequest};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for the currencies a clinic may bill in
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::IRR),
        Just(Currency::IRT),
        Just(Currency::USD),
        Just(Currency::EUR),
    ]
}

/// Strategy for tariff prices in minor units, from 1 Rial to 100 billion
pub fn price_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000_000i64
}

/// Strategy for Rial prices, including odd values that stress rounding
pub fn irr_price_strategy() -> impl Strategy<Value = Money> {
    price_minor_strategy().prop_map(|minor| Money::from_minor(minor, Currency::IRR))
}

/// Strategy for prices that may carry sub-unit digits before rounding
pub fn fractional_price_strategy() -> impl Strategy<Value = Money> {
    (1i64..10_000_000_000i64, 0u32..4u32)
        .prop_map(|(mantissa, scale)| Money::new(Decimal::new(mantissa, scale), Currency::IRR))
}

/// Strategy for percentages in 0..=100 with two fractional digits
pub fn percent_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10_000u32).prop_map(|n| Decimal::new(n as i64, 2))
}

/// Strategy for validated percentages
pub fn percentage_strategy() -> impl Strategy<Value = Percentage> {
    percent_strategy().prop_map(Percentage::saturating)
}

/// Strategy for percentages outside 0..=100
pub fn out_of_range_percent_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1u32..100_000u32).prop_map(|n| -Decimal::new(n as i64, 2)),
        (10_001u32..1_000_000u32).prop_map(|n| Decimal::new(n as i64, 2)),
    ]
}

/// Strategy for manual percentage pairs whose sum stays within 100
pub fn manual_percent_pair_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
    (0u32..=10_000u32).prop_flat_map(|insurer| {
        (0u32..=10_000u32 - insurer).prop_map(move |patient| {
            (Decimal::new(patient as i64, 2), Decimal::new(insurer as i64, 2))
        })
    })
}

/// Strategy for valid manual requests in Rials
pub fn manual_request_strategy() -> impl Strategy<Value = ManualShareRequest> {
    (irr_price_strategy(), manual_percent_pair_strategy()).prop_map(|(price, (patient, insurer))| {
        ManualShareRequest {
            tariff_price: price,
            patient_percent: patient,
            insurer_percent: insurer,
        }
    })
}

/// Strategy for valid automatic requests in Rials
///
/// The deductible ranges up to twice the price so the "deductible exceeds
/// price" path is exercised too.
pub fn automatic_request_strategy() -> impl Strategy<Value = AutomaticShareRequest> {
    (
        irr_price_strategy(),
        0u32..=200u32,
        percent_strategy(),
        percent_strategy(),
        proptest::option::of(0i64..10_000_000i64),
    )
        .prop_map(|(price, deductible_pct, primary, supplementary, ceiling)| {
            let deductible = (price.amount() * Decimal::from(deductible_pct) / Decimal::ONE_HUNDRED).trunc();
            AutomaticShareRequest {
                tariff_price: price,
                deductible: price.with_amount(deductible),
                primary_coverage_percent: primary,
                supplementary_coverage_percent: supplementary,
                supplementary_max_payment: ceiling.map(|c| Money::from_minor(c, Currency::IRR)),
            }
        })
}

/// Strategy for rounding modes
pub fn rounding_mode_strategy() -> impl Strategy<Value = RoundingMode> {
    prop_oneof![
        Just(RoundingMode::HalfAwayFromZero),
        Just(RoundingMode::HalfEven),
        Just(RoundingMode::TowardZero),
        Just(RoundingMode::AwayFromZero),
    ]
}

/// Strategy for rounding policies on Rial amounts
pub fn rounding_policy_strategy() -> impl Strategy<Value = RoundingPolicy> {
    (0u32..=2u32, 0u32..=4u32, rounding_mode_strategy())
        .prop_map(|(currency_dp, percent_dp, mode)| RoundingPolicy::new(currency_dp, percent_dp, mode))
}

/// Strategy for patient ages
pub fn age_strategy() -> impl Strategy<Value = u32> {
    0u32..=110u32
}

/// Strategy for genders
pub fn gender_strategy() -> impl Strategy<Value = Gender> {
    prop_oneof![Just(Gender::Male), Just(Gender::Female), Just(Gender::Other)]
}

/// Strategy for rule priorities
pub fn priority_strategy() -> impl Strategy<Value = u8> {
    1u8..=100u8
}
