//! Persisted business rule shape
//!
//! Rules are owned by the clinic's configuration store and arrive here
//! read-only. Conditions and actions are kept as the JSON text the store
//! holds; turning that text into typed values is the job of
//! [`CompiledRule::compile`](super::action::CompiledRule::compile), which may
//! fail per rule without affecting the others.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use core_kernel::{InsurancePlanId, RuleId, ServiceCategoryId, ServiceId, ValidityWindow};

/// Kind of parameter a rule overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    CoveragePercent,
    Deductible,
    PaymentLimit,
    SupplementaryInsurance,
    AgeBasedDiscount,
    GenderBasedDiscount,
    ServiceBasedDiscount,
    InsuranceBasedDiscount,
    CustomRule,
}

impl RuleType {
    /// Evaluation order used by the engine; custom rules run last
    pub const ALL: [RuleType; 9] = [
        RuleType::CoveragePercent,
        RuleType::Deductible,
        RuleType::SupplementaryInsurance,
        RuleType::PaymentLimit,
        RuleType::AgeBasedDiscount,
        RuleType::GenderBasedDiscount,
        RuleType::ServiceBasedDiscount,
        RuleType::InsuranceBasedDiscount,
        RuleType::CustomRule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::CoveragePercent => "coverage_percent",
            RuleType::Deductible => "deductible",
            RuleType::PaymentLimit => "payment_limit",
            RuleType::SupplementaryInsurance => "supplementary_insurance",
            RuleType::AgeBasedDiscount => "age_based_discount",
            RuleType::GenderBasedDiscount => "gender_based_discount",
            RuleType::ServiceBasedDiscount => "service_based_discount",
            RuleType::InsuranceBasedDiscount => "insurance_based_discount",
            RuleType::CustomRule => "custom_rule",
        }
    }

    /// Returns true for the four discount rule types
    pub fn is_discount(&self) -> bool {
        matches!(
            self,
            RuleType::AgeBasedDiscount
                | RuleType::GenderBasedDiscount
                | RuleType::ServiceBasedDiscount
                | RuleType::InsuranceBasedDiscount
        )
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        RuleType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .or_else(|| match normalized.as_str() {
                // PascalCase names as stored by older clinic databases
                "coveragepercent" => Some(RuleType::CoveragePercent),
                "paymentlimit" => Some(RuleType::PaymentLimit),
                "supplementaryinsurance" => Some(RuleType::SupplementaryInsurance),
                "agebaseddiscount" => Some(RuleType::AgeBasedDiscount),
                "genderbaseddiscount" => Some(RuleType::GenderBasedDiscount),
                "servicebaseddiscount" => Some(RuleType::ServiceBasedDiscount),
                "insurancebaseddiscount" => Some(RuleType::InsuranceBasedDiscount),
                "customrule" => Some(RuleType::CustomRule),
                _ => None,
            })
            .ok_or_else(|| format!("unknown rule type '{}'", s))
    }
}

/// Where a rule applies; an unset field matches any value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScope {
    #[serde(default)]
    pub insurance_plan_id: Option<InsurancePlanId>,
    #[serde(default)]
    pub service_category_id: Option<ServiceCategoryId>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
}

impl RuleScope {
    pub fn matches(
        &self,
        plan: &InsurancePlanId,
        category: &ServiceCategoryId,
        service: &ServiceId,
    ) -> bool {
        self.insurance_plan_id.as_ref().map_or(true, |p| p == plan)
            && self.service_category_id.as_ref().map_or(true, |c| c == category)
            && self.service_id.as_ref().map_or(true, |s| s == service)
    }
}

/// A business rule exactly as the store holds it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: RuleId,
    pub name: String,
    pub rule_type: RuleType,
    /// 1 is the highest precedence
    pub priority: u8,
    /// JSON condition list (or `{"match": ..., "conditions": [...]}` group)
    #[serde(deserialize_with = "json_text", default = "empty_list")]
    pub conditions: String,
    /// JSON action list
    #[serde(deserialize_with = "json_text")]
    pub actions: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(default)]
    pub validity: ValidityWindow,
}

impl BusinessRule {
    /// Returns true if the rule is active on the given day
    pub fn is_effective_on(&self, date: chrono::NaiveDate) -> bool {
        self.is_active && self.validity.contains(date)
    }
}

fn default_active() -> bool {
    true
}

fn empty_list() -> String {
    "[]".to_string()
}

/// Accepts either the persisted JSON text or the structure itself inline
fn json_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(text) => Ok(text),
        Value::Null => Ok(empty_list()),
        other => Ok(other.to_string()),
    }
}
