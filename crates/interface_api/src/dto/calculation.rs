//! Share calculation DTOs
//!
//! Amounts travel as integer minor units of their currency (Rials for IRR,
//! cents for USD). Percentages are accepted as JSON numbers or decimal
//! strings and reported as strings with two fractional digits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{
    CalculationId, ClinicTimezone, Currency, InsurancePlanId, Money, PatientId, Percentage,
    ServiceCategoryId, ServiceId, SupplementaryPlanId,
};
use domain_tariff::rules::{AppliedRule, SkippedRule};
use domain_tariff::{
    CalculationContext, FailureKind, Gender, InsurancePlanInfo, ManualShares, PatientInfo,
    ServiceInfo, ShareResult, SupplementaryPlanInfo,
};

use crate::error::ApiError;

fn validate_percent(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        let mut error = ValidationError::new("percent_range");
        error.message = Some(format!("{} is outside 0..=100", value).into());
        return Err(error);
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CalculateShareRequest {
    #[validate(nested)]
    pub patient: PatientDto,
    pub service: ServiceDto,
    #[validate(nested)]
    pub insurance_plan: InsurancePlanDto,
    /// Defaults to today in the clinic's timezone
    #[serde(default)]
    pub calculation_date: Option<NaiveDate>,
    /// Present for manual mode; checked by the calculator, not here
    #[serde(default)]
    pub manual_shares: Option<ManualSharesDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PatientDto {
    #[serde(default)]
    pub id: Option<PatientId>,
    #[validate(range(max = 150))]
    pub age: u32,
    pub gender: Gender,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDto {
    pub id: ServiceId,
    pub category_id: ServiceCategoryId,
    /// Tariff price in minor units
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<Currency>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InsurancePlanDto {
    pub id: InsurancePlanId,
    #[validate(custom(function = "validate_percent"))]
    pub coverage_percent: Decimal,
    /// Deductible in minor units
    #[serde(default)]
    pub deductible: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    #[validate(nested)]
    pub supplementary: Option<SupplementaryPlanDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SupplementaryPlanDto {
    pub id: SupplementaryPlanId,
    #[validate(custom(function = "validate_percent"))]
    pub coverage_percent: Decimal,
    /// Ceiling on the supplementary payment in minor units
    #[serde(default)]
    pub max_payment: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSharesDto {
    pub patient_percent: Decimal,
    pub insurer_percent: Decimal,
}

impl CalculateShareRequest {
    /// Converts the request into a calculation context
    ///
    /// `currency` is the one the service rounds for; a request naming another
    /// currency is rejected. `timezone` dates a request without a calculation
    /// date.
    pub fn into_context(
        self,
        currency: Currency,
        timezone: ClinicTimezone,
    ) -> Result<CalculationContext, ApiError> {
        if let Some(requested) = self.service.currency {
            if requested != currency {
                return Err(ApiError::BadRequest(format!(
                    "currency {} is not supported, this service calculates in {}",
                    requested, currency
                )));
            }
        }
        let percent = |value: Decimal| {
            Percentage::new(value).map_err(|e| ApiError::BadRequest(e.to_string()))
        };

        let supplementary = match self.insurance_plan.supplementary {
            Some(dto) => Some(SupplementaryPlanInfo {
                id: dto.id,
                coverage_percent: percent(dto.coverage_percent)?,
                max_payment: dto.max_payment.map(|m| Money::from_minor(m, currency)),
                is_active: dto.is_active,
            }),
            None => None,
        };

        Ok(CalculationContext {
            patient: PatientInfo {
                id: self.patient.id,
                age: self.patient.age,
                gender: self.patient.gender,
            },
            service: ServiceInfo {
                id: self.service.id,
                category_id: self.service.category_id,
                amount: Money::from_minor(self.service.amount, currency),
            },
            insurance_plan: InsurancePlanInfo {
                id: self.insurance_plan.id,
                coverage_percent: percent(self.insurance_plan.coverage_percent)?,
                deductible: Money::from_minor(self.insurance_plan.deductible, currency),
                is_active: self.insurance_plan.is_active,
                supplementary,
            },
            calculation_date: self.calculation_date.unwrap_or_else(|| timezone.today()),
            manual_shares: self.manual_shares.map(|m| ManualShares {
                patient_percent: m.patient_percent,
                insurer_percent: m.insurer_percent,
            }),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResultResponse {
    pub calculation_id: CalculationId,
    pub currency: Currency,
    pub original_price: i64,
    pub discount_amount: i64,
    pub tariff_price: i64,
    pub patient_share: i64,
    pub insurer_share: i64,
    pub supplementary_amount: i64,
    pub patient_share_percent: String,
    pub insurer_share_percent: String,
    pub supplementary_percent_of_total: Option<String>,
    pub is_valid: bool,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub applied_rules: Vec<AppliedRule>,
    pub skipped_rules: Vec<SkippedRule>,
}

fn percent_string(value: Decimal) -> String {
    format!("{:.2}", value)
}

impl TryFrom<ShareResult> for ShareResultResponse {
    type Error = ApiError;

    fn try_from(result: ShareResult) -> Result<Self, Self::Error> {
        Ok(Self {
            calculation_id: result.calculation_id,
            currency: result.tariff_price.currency(),
            original_price: result.original_price.to_minor()?,
            discount_amount: result.discount_amount.to_minor()?,
            tariff_price: result.tariff_price.to_minor()?,
            patient_share: result.patient_share.to_minor()?,
            insurer_share: result.insurer_share.to_minor()?,
            supplementary_amount: result.supplementary_amount.to_minor()?,
            patient_share_percent: percent_string(result.patient_share_percent),
            insurer_share_percent: percent_string(result.insurer_share_percent),
            supplementary_percent_of_total: result.supplementary_percent_of_total.map(percent_string),
            is_valid: result.is_valid,
            error_message: result.error_message,
            failure_kind: result.failure_kind,
            applied_rules: result.applied_rules,
            skipped_rules: result.skipped_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn request_json() -> serde_json::Value {
        json!({
            "patient": {"age": 40, "gender": "female"},
            "service": {
                "id": "00000000-0000-0000-0000-000000003001",
                "category_id": "00000000-0000-0000-0000-000000002001",
                "amount": 1000000
            },
            "insurance_plan": {
                "id": "00000000-0000-0000-0000-000000001001",
                "coverage_percent": 80,
                "deductible": 100000,
                "supplementary": {
                    "id": "00000000-0000-0000-0000-000000005001",
                    "coverage_percent": "50"
                }
            },
            "calculation_date": "2024-06-15"
        })
    }

    #[test]
    fn test_request_converts_minor_units() {
        let request: CalculateShareRequest = serde_json::from_value(request_json()).unwrap();
        assert!(request.validate().is_ok());

        let context = request
            .into_context(Currency::IRR, ClinicTimezone::default())
            .unwrap();
        assert_eq!(context.tariff_price(), dec!(1000000));
        assert_eq!(context.insurance_plan.deductible.amount(), dec!(100000));
        assert!(context.insurance_plan.is_active);
        assert_eq!(context.patient.gender, Gender::Female);
        let supplementary = context.active_supplementary().unwrap();
        assert_eq!(supplementary.coverage_percent.value(), dec!(50));
        assert!(context.manual_shares.is_none());
    }

    #[test]
    fn test_cents_for_two_decimal_currency() {
        let mut value = request_json();
        value["service"]["amount"] = json!(12345);
        value["service"]["currency"] = json!("USD");
        let request: CalculateShareRequest = serde_json::from_value(value).unwrap();

        let context = request
            .into_context(Currency::USD, ClinicTimezone::default())
            .unwrap();
        assert_eq!(context.currency(), Currency::USD);
        assert_eq!(context.tariff_price(), dec!(123.45));
    }

    #[test]
    fn test_currency_other_than_configured_is_rejected() {
        let mut value = request_json();
        value["service"]["currency"] = json!("USD");
        let request: CalculateShareRequest = serde_json::from_value(value).unwrap();

        let error = request
            .into_context(Currency::IRR, ClinicTimezone::default())
            .unwrap_err();
        assert!(matches!(error, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_coverage_out_of_range_fails_validation() {
        let mut value = request_json();
        value["insurance_plan"]["coverage_percent"] = json!(120);
        value["insurance_plan"]["supplementary"]["coverage_percent"] = json!(-1);
        let request: CalculateShareRequest = serde_json::from_value(value).unwrap();

        let errors = request.validate().unwrap_err();
        let ApiError::Validation(_, details) = ApiError::from(errors) else {
            panic!("expected a validation error");
        };
        assert_eq!(details.len(), 2);
        assert!(details[0].starts_with("insurance_plan.coverage_percent"));
        assert!(details[1].starts_with("insurance_plan.supplementary.coverage_percent"));
    }

    #[test]
    fn test_implausible_age_fails_validation() {
        let mut value = request_json();
        value["patient"]["age"] = json!(200);
        let request: CalculateShareRequest = serde_json::from_value(value).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_missing_date_uses_clinic_today() {
        let mut value = request_json();
        value.as_object_mut().unwrap().remove("calculation_date");
        let request: CalculateShareRequest = serde_json::from_value(value).unwrap();

        let timezone = ClinicTimezone::default();
        let context = request.into_context(Currency::IRR, timezone).unwrap();
        assert_eq!(context.calculation_date, timezone.today());
    }

    #[test]
    fn test_percent_string_has_two_digits() {
        assert_eq!(percent_string(dec!(80)), "80.00");
        assert_eq!(percent_string(dec!(14.5)), "14.50");
    }
}
