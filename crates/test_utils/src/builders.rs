//! Test Data Builders
//!
//! Builder patterns for calculation contexts and business rules. Tests set
//! only the fields they care about; everything else falls back to the
//! fixtures.

use chrono::NaiveDate;
use core_kernel::{
    InsurancePlanId, Money, Percentage, RuleId, ServiceCategoryId, ServiceId, ValidityWindow,
};
use domain_tariff::rules::{BusinessRule, RuleScope, RuleType};
use domain_tariff::{
    CalculationContext, Gender, InsurancePlanInfo, ManualShares, PatientInfo, ServiceInfo,
    SupplementaryPlanInfo,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{DateFixtures, IdFixtures, MoneyFixtures, RuleJsonFixtures};

/// Builder for calculation contexts
///
/// Defaults: a 40 year old man, a 1,000,000 IRR visit, an active plan with
/// 80% coverage, no deductible and no supplementary plan.
#[derive(Debug, Clone)]
pub struct CalculationContextBuilder {
    age: u32,
    gender: Gender,
    service_id: ServiceId,
    category_id: ServiceCategoryId,
    amount: Money,
    plan_id: InsurancePlanId,
    coverage_percent: Percentage,
    deductible: Money,
    plan_active: bool,
    supplementary: Option<SupplementaryPlanInfo>,
    calculation_date: NaiveDate,
    manual_shares: Option<ManualShares>,
}

impl Default for CalculationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculationContextBuilder {
    pub fn new() -> Self {
        Self {
            age: 40,
            gender: Gender::Male,
            service_id: IdFixtures::service_id(),
            category_id: IdFixtures::category_id(),
            amount: MoneyFixtures::visit_fee(),
            plan_id: IdFixtures::plan_id(),
            coverage_percent: Percentage::saturating(dec!(80)),
            deductible: MoneyFixtures::irr_zero(),
            plan_active: true,
            supplementary: None,
            calculation_date: DateFixtures::calculation_day(),
            manual_shares: None,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    /// Sets the tariff price in Rials
    pub fn with_price(mut self, amount: Decimal) -> Self {
        self.amount = MoneyFixtures::irr(amount);
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_service(mut self, id: ServiceId) -> Self {
        self.service_id = id;
        self
    }

    pub fn with_category(mut self, id: ServiceCategoryId) -> Self {
        self.category_id = id;
        self
    }

    pub fn with_plan(mut self, id: InsurancePlanId) -> Self {
        self.plan_id = id;
        self
    }

    pub fn with_coverage(mut self, percent: Decimal) -> Self {
        self.coverage_percent = Percentage::saturating(percent);
        self
    }

    /// Sets the plan deductible in the currency of the tariff
    pub fn with_deductible(mut self, amount: Decimal) -> Self {
        self.deductible = self.amount.with_amount(amount);
        self
    }

    pub fn inactive_plan(mut self) -> Self {
        self.plan_active = false;
        self
    }

    /// Attaches an active supplementary plan
    pub fn with_supplementary(mut self, percent: Decimal, max_payment: Option<Decimal>) -> Self {
        let currency = self.amount.currency();
        self.supplementary = Some(SupplementaryPlanInfo {
            id: IdFixtures::supplementary_plan_id(),
            coverage_percent: Percentage::saturating(percent),
            max_payment: max_payment.map(|m| Money::new(m, currency)),
            is_active: true,
        });
        self
    }

    pub fn with_inactive_supplementary(mut self, percent: Decimal) -> Self {
        self = self.with_supplementary(percent, None);
        if let Some(supplementary) = self.supplementary.as_mut() {
            supplementary.is_active = false;
        }
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.calculation_date = date;
        self
    }

    pub fn with_manual_shares(mut self, patient_percent: Decimal, insurer_percent: Decimal) -> Self {
        self.manual_shares = Some(ManualShares {
            patient_percent,
            insurer_percent,
        });
        self
    }

    pub fn build(self) -> CalculationContext {
        CalculationContext {
            patient: PatientInfo {
                id: Some(IdFixtures::patient_id()),
                age: self.age,
                gender: self.gender,
            },
            service: ServiceInfo {
                id: self.service_id,
                category_id: self.category_id,
                amount: self.amount,
            },
            insurance_plan: InsurancePlanInfo {
                id: self.plan_id,
                coverage_percent: self.coverage_percent,
                deductible: self.deductible,
                is_active: self.plan_active,
                supplementary: self.supplementary,
            },
            calculation_date: self.calculation_date,
            manual_shares: self.manual_shares,
        }
    }
}

/// Builder for stored business rules
///
/// Defaults: an active, unscoped, always valid rule with priority 50 and no
/// conditions. The actions default to a payload matching the rule type.
#[derive(Debug, Clone)]
pub struct BusinessRuleBuilder {
    id: RuleId,
    name: String,
    rule_type: RuleType,
    priority: u8,
    conditions: String,
    actions: Option<String>,
    is_active: bool,
    scope: RuleScope,
    validity: ValidityWindow,
}

impl BusinessRuleBuilder {
    pub fn new(rule_type: RuleType) -> Self {
        Self {
            id: RuleId::new(),
            name: format!("{} rule", rule_type),
            rule_type,
            priority: 50,
            conditions: RuleJsonFixtures::no_conditions().to_string(),
            actions: None,
            is_active: true,
            scope: RuleScope::default(),
            validity: ValidityWindow::always(),
        }
    }

    pub fn coverage(percent: u32) -> Self {
        Self::new(RuleType::CoveragePercent).with_actions(RuleJsonFixtures::coverage(percent))
    }

    pub fn deductible(amount: u64) -> Self {
        Self::new(RuleType::Deductible).with_actions(RuleJsonFixtures::deductible(amount))
    }

    pub fn discount(rule_type: RuleType, percent: u32) -> Self {
        Self::new(rule_type).with_actions(RuleJsonFixtures::discount(percent))
    }

    pub fn insurer_ceiling(amount: u64) -> Self {
        Self::new(RuleType::PaymentLimit).with_actions(RuleJsonFixtures::max_insurer_payment(amount))
    }

    pub fn patient_ceiling(amount: u64) -> Self {
        Self::new(RuleType::PaymentLimit).with_actions(RuleJsonFixtures::max_patient_payment(amount))
    }

    pub fn with_id(mut self, id: RuleId) -> Self {
        self.id = id;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_conditions(mut self, json: impl Into<String>) -> Self {
        self.conditions = json.into();
        self
    }

    pub fn with_actions(mut self, json: impl Into<String>) -> Self {
        self.actions = Some(json.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn for_plan(mut self, plan: InsurancePlanId) -> Self {
        self.scope.insurance_plan_id = Some(plan);
        self
    }

    pub fn for_category(mut self, category: ServiceCategoryId) -> Self {
        self.scope.service_category_id = Some(category);
        self
    }

    pub fn for_service(mut self, service: ServiceId) -> Self {
        self.scope.service_id = Some(service);
        self
    }

    pub fn valid_between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.validity = ValidityWindow {
            start: Some(start),
            end: Some(end),
        };
        self
    }

    pub fn build(self) -> BusinessRule {
        let actions = self
            .actions
            .unwrap_or_else(|| default_actions(self.rule_type));
        BusinessRule {
            id: self.id,
            name: self.name,
            rule_type: self.rule_type,
            priority: self.priority,
            conditions: self.conditions,
            actions,
            is_active: self.is_active,
            scope: self.scope,
            validity: self.validity,
        }
    }
}

fn default_actions(rule_type: RuleType) -> String {
    match rule_type {
        RuleType::CoveragePercent => RuleJsonFixtures::coverage(70),
        RuleType::Deductible => RuleJsonFixtures::deductible(0),
        RuleType::PaymentLimit => RuleJsonFixtures::max_insurer_payment(10_000_000),
        RuleType::SupplementaryInsurance => {
            r#"[{"type": "supplementary_applicable", "value": true}]"#.to_string()
        }
        RuleType::AgeBasedDiscount
        | RuleType::GenderBasedDiscount
        | RuleType::ServiceBasedDiscount
        | RuleType::InsuranceBasedDiscount
        | RuleType::CustomRule => RuleJsonFixtures::discount(10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let context = CalculationContextBuilder::new().build();
        assert_eq!(context.tariff_price(), dec!(1000000));
        assert!(context.insurance_plan.is_active);
        assert!(context.manual_shares.is_none());
    }

    #[test]
    fn test_rule_builder_defaults_actions_by_type() {
        let rule = BusinessRuleBuilder::new(RuleType::CoveragePercent).build();
        assert!(rule.actions.contains("coverage_percent"));
        assert!(rule.is_active);
        assert!(rule.validity.is_unbounded());
    }
}
