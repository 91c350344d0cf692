//! Calculation context
//!
//! Everything one share calculation needs to know about the patient, the
//! service line and the insurance plan. The caller (reception or billing)
//! resolves these values from its own storage; the tariff core never loads
//! them itself and never persists the context.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    Currency, InsurancePlanId, Money, PatientId, Percentage, ServiceCategoryId, ServiceId,
    SupplementaryPlanId,
};

/// Patient gender as recorded at reception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "مرد" => Ok(Gender::Male),
            "female" | "f" | "زن" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        };
        f.write_str(s)
    }
}

/// Patient attributes rules may condition on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub id: Option<PatientId>,
    /// Age in whole years on the calculation date
    pub age: u32,
    pub gender: Gender,
}

/// The billable service line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub category_id: ServiceCategoryId,
    /// Tariff price before any coverage or discount
    pub amount: Money,
}

/// Secondary plan stacked on top of the primary insurance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementaryPlanInfo {
    pub id: SupplementaryPlanId,
    /// Share of what the primary insurer leaves unpaid
    pub coverage_percent: Percentage,
    /// Ceiling on what the supplementary plan pays for one service line
    pub max_payment: Option<Money>,
    pub is_active: bool,
}

/// Primary insurance plan of the patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePlanInfo {
    pub id: InsurancePlanId,
    /// Contractual base coverage
    pub coverage_percent: Percentage,
    pub deductible: Money,
    pub is_active: bool,
    #[serde(default)]
    pub supplementary: Option<SupplementaryPlanInfo>,
}

/// Percentages typed in by reception staff, bypassing automatic coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualShares {
    pub patient_percent: Decimal,
    pub insurer_percent: Decimal,
}

/// Input of a single share calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationContext {
    pub patient: PatientInfo,
    pub service: ServiceInfo,
    pub insurance_plan: InsurancePlanInfo,
    pub calculation_date: NaiveDate,
    #[serde(default)]
    pub manual_shares: Option<ManualShares>,
}

impl CalculationContext {
    /// Currency every amount of this calculation is expressed in
    pub fn currency(&self) -> Currency {
        self.service.amount.currency()
    }

    /// Tariff price as a bare decimal
    pub fn tariff_price(&self) -> Decimal {
        self.service.amount.amount()
    }

    /// The supplementary plan, if one is attached and active
    pub fn active_supplementary(&self) -> Option<&SupplementaryPlanInfo> {
        self.insurance_plan
            .supplementary
            .as_ref()
            .filter(|s| s.is_active)
    }

    /// Returns true when reception supplied both manual percentages
    pub fn is_manual(&self) -> bool {
        self.manual_shares.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parsing_accepts_persian_labels() {
        assert_eq!("زن".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert!("unknown".parse::<Gender>().is_err());
    }

    #[test]
    fn test_gender_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
    }
}
