//! Custom Test Assertions
//!
//! Assertion helpers for money and share results that give more meaningful
//! failure messages than plain `assert_eq!`.

use core_kernel::Money;
use domain_tariff::{FailureKind, ShareBreakdown, ShareResult};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value equals an amount exactly
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Expected {} {}, got {}",
        expected,
        actual.currency(),
        actual
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that a Money value carries no digits beyond its currency precision
pub fn assert_currency_precision(money: &Money) {
    assert!(
        money.to_minor().is_ok(),
        "{} has more precision than {} allows",
        money.amount(),
        money.currency()
    );
}

/// Asserts that a decimal value is within a range
pub fn assert_decimal_in_range(value: Decimal, min: Decimal, max: Decimal) {
    assert!(
        value >= min && value <= max,
        "Decimal {} is not in range [{}, {}]",
        value,
        min,
        max
    );
}

/// Asserts the reconciliation invariants of a calculator breakdown
///
/// Shares add up to the price exactly, neither is negative, and both
/// percentages lie in 0..=100 with a sum of at most 100.
pub fn assert_breakdown_reconciled(breakdown: &ShareBreakdown) {
    let total = breakdown.patient_share.amount() + breakdown.insurer_share.amount();
    assert_eq!(
        total,
        breakdown.tariff_price.amount(),
        "Shares {} + {} do not add up to price {}",
        breakdown.patient_share,
        breakdown.insurer_share,
        breakdown.tariff_price
    );
    assert!(
        !breakdown.patient_share.is_negative() && !breakdown.insurer_share.is_negative(),
        "Negative share in {:?}",
        breakdown
    );
    assert_percent_pair(breakdown.patient_percent, breakdown.insurer_percent);
}

/// Asserts that a result is valid and reconciled
pub fn assert_share_reconciled(result: &ShareResult) {
    assert!(
        result.is_valid,
        "Expected a valid result, got error: {:?}",
        result.error_message
    );
    assert_eq!(
        result.reconciled_total(),
        result.tariff_price.amount(),
        "Shares {} + {} do not add up to price {}",
        result.patient_share,
        result.insurer_share,
        result.tariff_price
    );
    assert_percent_pair(result.patient_share_percent, result.insurer_share_percent);
}

/// Asserts that a result is invalid for the given reason
pub fn assert_share_rejected(result: &ShareResult, kind: FailureKind) {
    assert!(!result.is_valid, "Expected an invalid result, got {:?}", result);
    assert_eq!(result.failure_kind, Some(kind), "Unexpected failure kind");
    assert!(
        result.error_message.as_deref().is_some_and(|m| !m.is_empty()),
        "Invalid result carries no message"
    );
}

fn assert_percent_pair(patient: Decimal, insurer: Decimal) {
    assert_decimal_in_range(patient, Decimal::ZERO, Decimal::ONE_HUNDRED);
    assert_decimal_in_range(insurer, Decimal::ZERO, Decimal::ONE_HUNDRED);
    assert!(
        patient + insurer <= Decimal::ONE_HUNDRED,
        "Percentages {} + {} exceed 100",
        patient,
        insurer
    );
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that a result is Err and returns the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => panic!("{}: got Ok({:?})", $msg, value),
            Err(e) => e,
        }
    };
}
