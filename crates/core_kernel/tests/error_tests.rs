//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::temporal::TemporalError;
use rust_decimal_macros::dec;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::PercentageOutOfRange(dec!(120));
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
    assert!(core_error.to_string().contains("120"));
}

#[test]
fn test_core_error_from_temporal_error() {
    let core_error: CoreError = TemporalError::UnknownTimezone("Nowhere/City".to_string()).into();
    assert!(matches!(core_error, CoreError::Temporal(_)));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("Missing rounding mode");

    match error {
        CoreError::Configuration(msg) => assert_eq!(msg, "Missing rounding mode"),
        _ => panic!("Expected Configuration error"),
    }
}
