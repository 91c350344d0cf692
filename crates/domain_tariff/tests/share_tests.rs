//! Tests for the share calculator

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, MoneyError, RoundingMode, RoundingPolicy};
use domain_tariff::{
    AutomaticShareRequest, ManualShareRequest, ShareCalculator, ShareError, ShareMode,
    ShareRequest,
};

use test_utils::{assert_breakdown_reconciled, assert_money_eq, MoneyFixtures};

fn manual(price: Decimal, patient: Decimal, insurer: Decimal) -> ManualShareRequest {
    ManualShareRequest {
        tariff_price: MoneyFixtures::irr(price),
        patient_percent: patient,
        insurer_percent: insurer,
    }
}

fn automatic(
    price: Decimal,
    deductible: Decimal,
    primary: Decimal,
    supplementary: Decimal,
    ceiling: Option<Decimal>,
) -> AutomaticShareRequest {
    AutomaticShareRequest {
        tariff_price: MoneyFixtures::irr(price),
        deductible: MoneyFixtures::irr(deductible),
        primary_coverage_percent: primary,
        supplementary_coverage_percent: supplementary,
        supplementary_max_payment: ceiling.map(MoneyFixtures::irr),
    }
}

// ============================================================================
// Manual Mode Tests
// ============================================================================

mod manual_tests {
    use super::*;

    #[test]
    fn test_seventy_percent_insurer() {
        let breakdown = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000000), dec!(30), dec!(70)))
            .unwrap();

        assert_eq!(breakdown.mode, ShareMode::Manual);
        assert_money_eq(&breakdown.insurer_share, dec!(700000));
        assert_money_eq(&breakdown.patient_share, dec!(300000));
        assert_eq!(breakdown.insurer_percent, dec!(70));
        assert_eq!(breakdown.patient_percent, dec!(30));
        assert!(breakdown.supplementary_percent_of_total.is_none());
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_sum_over_hundred_is_rejected() {
        let error = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000000), dec!(60), dec!(50)))
            .unwrap_err();

        assert_eq!(
            error,
            ShareError::PercentageSumExceeded {
                patient: dec!(60),
                insurer: dec!(50),
                sum: dec!(110),
            }
        );
    }

    #[test]
    fn test_sum_under_hundred_gives_patient_the_rest() {
        let breakdown = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000000), dec!(20), dec!(70)))
            .unwrap();

        assert_money_eq(&breakdown.patient_share, dec!(300000));
        assert_eq!(breakdown.patient_percent, dec!(30));
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_odd_price_reconciles_by_subtraction() {
        let breakdown = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000001), dec!(66.67), dec!(33.33)))
            .unwrap();

        assert_money_eq(&breakdown.insurer_share, dec!(333300));
        assert_money_eq(&breakdown.patient_share, dec!(666701));
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_half_rial_rounds_away_from_zero() {
        let breakdown = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000005), dec!(50), dec!(50)))
            .unwrap();

        assert_money_eq(&breakdown.insurer_share, dec!(500003));
        assert_money_eq(&breakdown.patient_share, dec!(500002));
    }

    #[test]
    fn test_negative_percentage_is_rejected() {
        let error = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000000), dec!(-5), dec!(70)))
            .unwrap_err();

        assert!(matches!(
            error,
            ShareError::InvalidPercentage {
                field: "patient_percent",
                ..
            }
        ));
    }

    #[test]
    fn test_full_insurer_share() {
        let breakdown = ShareCalculator::default()
            .calculate_manual(&manual(dec!(1000000), dec!(0), dec!(100)))
            .unwrap();

        assert!(breakdown.patient_share.is_zero());
        assert_eq!(breakdown.insurer_percent, dec!(100));
    }
}

// ============================================================================
// Automatic Mode Tests
// ============================================================================

mod automatic_tests {
    use super::*;

    #[test]
    fn test_deductible_primary_and_supplementary() {
        let breakdown = ShareCalculator::default()
            .calculate_automatic(&automatic(
                dec!(1000000),
                dec!(100000),
                dec!(80),
                dec!(50),
                None,
            ))
            .unwrap();

        assert_money_eq(&breakdown.coverable_amount, dec!(900000));
        assert_money_eq(&breakdown.insurer_base, dec!(720000));
        assert_money_eq(&breakdown.remaining_after_primary, dec!(280000));
        assert_money_eq(&breakdown.supplementary_amount, dec!(140000));
        assert_money_eq(&breakdown.insurer_share, dec!(860000));
        assert_money_eq(&breakdown.patient_share, dec!(140000));
        assert_eq!(breakdown.insurer_percent, dec!(86));
        assert_eq!(breakdown.supplementary_percent_of_total, Some(dec!(14)));
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_supplementary_ceiling_caps_amount() {
        let breakdown = ShareCalculator::default()
            .calculate_automatic(&automatic(
                dec!(1000000),
                dec!(100000),
                dec!(80),
                dec!(50),
                Some(dec!(50000)),
            ))
            .unwrap();

        assert_money_eq(&breakdown.supplementary_amount, dec!(50000));
        assert_money_eq(&breakdown.insurer_share, dec!(770000));
        assert_money_eq(&breakdown.patient_share, dec!(230000));
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_deductible_above_price_leaves_nothing_for_primary() {
        let breakdown = ShareCalculator::default()
            .calculate_automatic(&automatic(
                dec!(1000000),
                dec!(2000000),
                dec!(80),
                dec!(0),
                None,
            ))
            .unwrap();

        assert!(breakdown.coverable_amount.is_zero());
        assert!(breakdown.insurer_share.is_zero());
        assert_money_eq(&breakdown.patient_share, dec!(1000000));
        assert!(breakdown.supplementary_percent_of_total.is_none());
    }

    #[test]
    fn test_no_coverage_patient_pays_all() {
        let breakdown = ShareCalculator::default()
            .calculate_automatic(&automatic(dec!(750000), dec!(0), dec!(0), dec!(0), None))
            .unwrap();

        assert_money_eq(&breakdown.patient_share, dec!(750000));
        assert_eq!(breakdown.patient_percent, dec!(100));
    }

    #[test]
    fn test_negative_deductible_is_rejected() {
        let error = ShareCalculator::default()
            .calculate_automatic(&automatic(dec!(1000000), dec!(-1), dec!(80), dec!(0), None))
            .unwrap_err();
        assert!(matches!(error, ShareError::InvalidDeductible(_)));
    }

    #[test]
    fn test_negative_ceiling_is_rejected() {
        let error = ShareCalculator::default()
            .calculate_automatic(&automatic(
                dec!(1000000),
                dec!(0),
                dec!(80),
                dec!(50),
                Some(dec!(-10)),
            ))
            .unwrap_err();
        assert!(matches!(error, ShareError::InvalidPaymentCeiling(_)));
    }

    #[test]
    fn test_primary_over_hundred_is_rejected() {
        let error = ShareCalculator::default()
            .calculate_automatic(&automatic(dec!(1000000), dec!(0), dec!(100.01), dec!(0), None))
            .unwrap_err();
        assert!(matches!(
            error,
            ShareError::InvalidPercentage {
                field: "primary_coverage_percent",
                ..
            }
        ));
    }

    #[test]
    fn test_deductible_in_other_currency_is_rejected() {
        let mut request = automatic(dec!(1000000), dec!(0), dec!(80), dec!(0), None);
        request.deductible = MoneyFixtures::usd_100();

        let error = ShareCalculator::default()
            .calculate_automatic(&request)
            .unwrap_err();
        assert!(matches!(error, ShareError::Money(_)));
    }
}

// ============================================================================
// Price and Rounding Tests
// ============================================================================

mod rounding_tests {
    use super::*;

    #[test]
    fn test_zero_price_is_rejected() {
        let request = ShareRequest::Manual(manual(dec!(0), dec!(30), dec!(70)));
        let error = ShareCalculator::default().calculate(&request).unwrap_err();
        assert!(matches!(error, ShareError::InvalidTariffPrice(_)));
    }

    #[test]
    fn test_price_rounding_to_zero_is_rejected() {
        let request = ShareRequest::Automatic(automatic(dec!(0.4), dec!(0), dec!(80), dec!(0), None));
        let error = ShareCalculator::default().calculate(&request).unwrap_err();
        assert!(matches!(error, ShareError::InvalidTariffPrice(_)));
    }

    #[test]
    fn test_price_is_rounded_before_split() {
        let breakdown = ShareCalculator::default()
            .calculate_manual(&manual(dec!(999.6), dec!(50), dec!(50)))
            .unwrap();
        assert_money_eq(&breakdown.tariff_price, dec!(1000));
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_cents_with_currency_policy() {
        let calculator = ShareCalculator::new(RoundingPolicy::for_currency(Currency::USD));
        let breakdown = calculator
            .calculate_manual(&ManualShareRequest {
                tariff_price: Money::new(dec!(100.00), Currency::USD),
                patient_percent: dec!(66.67),
                insurer_percent: dec!(33.33),
            })
            .unwrap();

        assert_money_eq(&breakdown.insurer_share, dec!(33.33));
        assert_money_eq(&breakdown.patient_share, dec!(66.67));
    }

    #[test]
    fn test_policy_finer_than_money_scale_still_reconciles() {
        let calculator = ShareCalculator::new(RoundingPolicy::new(6, 2, RoundingMode::HalfAwayFromZero));
        let breakdown = calculator
            .calculate_manual(&ManualShareRequest {
                tariff_price: Money::new(dec!(0.0001), Currency::USD),
                patient_percent: dec!(50),
                insurer_percent: dec!(50),
            })
            .unwrap();

        assert_money_eq(&breakdown.tariff_price, dec!(0.0001));
        assert_money_eq(&breakdown.insurer_share, dec!(0.0001));
        assert_money_eq(&breakdown.patient_share, dec!(0));
        assert_breakdown_reconciled(&breakdown);
    }

    #[test]
    fn test_huge_price_overflow_is_an_error() {
        let calculator = ShareCalculator::default();

        let error = calculator
            .calculate_manual(&manual(Decimal::MAX, dec!(0), dec!(100)))
            .unwrap_err();
        assert!(matches!(error, ShareError::Money(MoneyError::Overflow)));

        let error = calculator
            .calculate_automatic(&automatic(Decimal::MAX, dec!(0), dec!(80), dec!(0), None))
            .unwrap_err();
        assert!(matches!(error, ShareError::Money(MoneyError::Overflow)));
    }

    #[test]
    fn test_bankers_rounding_policy() {
        let calculator = ShareCalculator::new(RoundingPolicy::new(0, 2, RoundingMode::HalfEven));
        let breakdown = calculator
            .calculate_manual(&manual(dec!(1000005), dec!(50), dec!(50)))
            .unwrap();

        assert_money_eq(&breakdown.insurer_share, dec!(500002));
        assert_money_eq(&breakdown.patient_share, dec!(500003));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use test_utils::{
        automatic_request_strategy, manual_request_strategy, out_of_range_percent_strategy,
        rounding_policy_strategy,
    };

    proptest! {
        #[test]
        fn prop_manual_split_reconciles(
            request in manual_request_strategy(),
            policy in rounding_policy_strategy(),
        ) {
            let breakdown = ShareCalculator::new(policy).calculate_manual(&request).unwrap();
            prop_assert_eq!(
                breakdown.patient_share.amount() + breakdown.insurer_share.amount(),
                breakdown.tariff_price.amount()
            );
            prop_assert!(!breakdown.patient_share.is_negative());
            prop_assert!(!breakdown.insurer_share.is_negative());
            prop_assert!(breakdown.insurer_percent <= Decimal::ONE_HUNDRED);
            prop_assert!(breakdown.patient_percent >= Decimal::ZERO);
        }

        #[test]
        fn prop_automatic_split_reconciles(
            request in automatic_request_strategy(),
            policy in rounding_policy_strategy(),
        ) {
            let breakdown = ShareCalculator::new(policy).calculate_automatic(&request).unwrap();
            prop_assert_eq!(
                breakdown.patient_share.amount() + breakdown.insurer_share.amount(),
                breakdown.tariff_price.amount()
            );
            prop_assert!(!breakdown.patient_share.is_negative());
            prop_assert!(breakdown.insurer_share.amount() <= breakdown.tariff_price.amount());
            prop_assert!(breakdown.insurer_base.amount() <= breakdown.coverable_amount.amount());
        }

        #[test]
        fn prop_supplementary_never_exceeds_ceiling(request in automatic_request_strategy()) {
            let breakdown = ShareCalculator::default().calculate_automatic(&request).unwrap();
            if let Some(ceiling) = request.supplementary_max_payment {
                prop_assert!(breakdown.supplementary_amount.amount() <= ceiling.amount());
            }
            prop_assert!(
                breakdown.supplementary_amount.amount() <= breakdown.remaining_after_primary.amount()
            );
        }

        #[test]
        fn prop_out_of_range_insurer_percent_is_rejected(insurer in out_of_range_percent_strategy()) {
            let result = ShareCalculator::default()
                .calculate_manual(&manual(dec!(1000000), dec!(0), insurer));
            let is_percentage_error = matches!(result, Err(ShareError::InvalidPercentage { .. }));
            prop_assert!(is_percentage_error);
        }
    }
}
