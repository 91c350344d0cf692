//! Business rule engine
//!
//! Turns a calculation context into the effective coverage parameters. For
//! each rule type the engine fetches the candidate rules, orders them by
//! priority (1 first, ties broken by rule id), compiles them and applies the
//! ones whose conditions hold:
//!
//! | rule type                        | combination                         |
//! |----------------------------------|-------------------------------------|
//! | coverage, deductible, supplementary | first match wins                 |
//! | payment limit                    | every match, tightest ceiling kept  |
//! | age/gender/service/insurance discounts | summed, capped at 100%        |
//! | custom                           | every match, actions in order, last |
//!
//! A rule that fails to compile is skipped with a warning; the calculation
//! goes on with the others. Only a failing rule store aborts evaluation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use core_kernel::{Currency, Money, Percentage, PortError, RuleId};

use super::action::{CompiledRule, RuleAction, RuleEffect};
use super::model::{BusinessRule, RuleType};
use super::ports::{RuleQuery, RuleRepository};
use crate::context::CalculationContext;
use crate::error::TariffError;

/// Ceilings checked against the final split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentLimit {
    pub insurer_max: Option<Money>,
    pub patient_max: Option<Money>,
}

/// A share above its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum LimitViolation {
    Insurer { share: Money, limit: Money },
    Patient { share: Money, limit: Money },
}

impl PaymentLimit {
    /// Keeps the lower of the current and the new ceiling on each side
    pub fn tighten(&mut self, insurer_max: Option<Money>, patient_max: Option<Money>) {
        fn lower(current: Option<Money>, new: Option<Money>) -> Option<Money> {
            match (current, new) {
                (Some(c), Some(n)) => Some(if n.amount() < c.amount() { n } else { c }),
                (c, n) => c.or(n),
            }
        }
        self.insurer_max = lower(self.insurer_max, insurer_max);
        self.patient_max = lower(self.patient_max, patient_max);
    }

    pub fn is_empty(&self) -> bool {
        self.insurer_max.is_none() && self.patient_max.is_none()
    }

    /// Returns the first exceeded ceiling, insurer side first
    pub fn check(&self, insurer_share: Money, patient_share: Money) -> Option<LimitViolation> {
        if let Some(limit) = self.insurer_max {
            if insurer_share.amount() > limit.amount() {
                return Some(LimitViolation::Insurer {
                    share: insurer_share,
                    limit,
                });
            }
        }
        if let Some(limit) = self.patient_max {
            if patient_share.amount() > limit.amount() {
                return Some(LimitViolation::Patient {
                    share: patient_share,
                    limit,
                });
            }
        }
        None
    }
}

/// Plan values after every matching rule has been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveParameters {
    pub coverage_percent: Percentage,
    pub deductible: Money,
    pub payment_limit: Option<PaymentLimit>,
    pub discount_percent: Option<Percentage>,
    pub supplementary_coverage_percent: Option<Percentage>,
    pub supplementary_max_payment: Option<Money>,
    pub supplementary_applicable: bool,
}

impl EffectiveParameters {
    /// The plan's own values, before any rule
    ///
    /// An inactive plan covers nothing: no base coverage, no deductible and
    /// no supplementary plan.
    pub fn from_context(context: &CalculationContext) -> Self {
        let currency = context.currency();
        let plan = &context.insurance_plan;
        if !plan.is_active {
            return Self::uninsured(currency);
        }

        let supplementary = context.active_supplementary();
        Self {
            coverage_percent: plan.coverage_percent,
            deductible: plan.deductible,
            payment_limit: None,
            discount_percent: None,
            supplementary_coverage_percent: supplementary.map(|s| s.coverage_percent),
            supplementary_max_payment: supplementary.and_then(|s| s.max_payment),
            supplementary_applicable: supplementary.is_some(),
        }
    }

    /// Parameters of a patient without usable insurance
    pub fn uninsured(currency: Currency) -> Self {
        Self {
            coverage_percent: Percentage::ZERO,
            deductible: Money::zero(currency),
            payment_limit: None,
            discount_percent: None,
            supplementary_coverage_percent: None,
            supplementary_max_payment: None,
            supplementary_applicable: false,
        }
    }

    /// Supplementary percentage to feed the calculator, zero when not applicable
    pub fn effective_supplementary_percent(&self) -> Percentage {
        if self.supplementary_applicable {
            self.supplementary_coverage_percent.unwrap_or(Percentage::ZERO)
        } else {
            Percentage::ZERO
        }
    }

    pub fn add_discount(&mut self, percent: Percentage) {
        self.discount_percent = Some(match self.discount_percent {
            Some(current) => current.saturating_add(percent),
            None => percent,
        });
    }

    fn tighten_limit(&mut self, insurer_max: Option<Money>, patient_max: Option<Money>) {
        let limit = self.payment_limit.get_or_insert_with(PaymentLimit::default);
        limit.tighten(insurer_max, patient_max);
    }

    fn apply_action(&mut self, action: &RuleAction, currency: Currency) {
        let money = |amount: Decimal| Money::new(amount, currency);
        match action {
            RuleAction::CoveragePercent(p) => self.coverage_percent = *p,
            RuleAction::Deductible(d) => self.deductible = money(*d),
            RuleAction::MaxInsurerPayment(d) => self.tighten_limit(Some(money(*d)), None),
            RuleAction::MaxPatientPayment(d) => self.tighten_limit(None, Some(money(*d))),
            RuleAction::DiscountPercent(p) => self.add_discount(*p),
            RuleAction::SupplementaryCoveragePercent(p) => {
                self.supplementary_coverage_percent = Some(*p)
            }
            RuleAction::SupplementaryMaxPayment(d) => {
                self.supplementary_max_payment = Some(money(*d))
            }
            RuleAction::SupplementaryApplicable(b) => self.supplementary_applicable = *b,
        }
    }
}

/// A rule whose conditions held and whose effect was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub id: RuleId,
    pub name: String,
    pub rule_type: RuleType,
}

/// A rule left out because it could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub id: RuleId,
    pub name: String,
    pub reason: String,
}

/// Engine output: the parameters plus how they were reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub parameters: EffectiveParameters,
    pub applied_rules: Vec<AppliedRule>,
    pub skipped_rules: Vec<SkippedRule>,
}

/// Evaluates stored business rules against a calculation context
#[derive(Clone)]
pub struct BusinessRuleEngine {
    repository: Arc<dyn RuleRepository>,
    fetch_timeout: Option<Duration>,
}

impl BusinessRuleEngine {
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self {
            repository,
            fetch_timeout: None,
        }
    }

    /// Bounds each rule fetch; an elapsed fetch counts as store unavailable
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn repository(&self) -> &Arc<dyn RuleRepository> {
        &self.repository
    }

    /// Produces the effective parameters for a context
    #[instrument(
        skip_all,
        fields(
            plan = %context.insurance_plan.id,
            service = %context.service.id,
            date = %context.calculation_date
        )
    )]
    pub async fn evaluate(&self, context: &CalculationContext) -> Result<RuleEvaluation, TariffError> {
        let currency = context.currency();
        let plan_active = context.insurance_plan.is_active;
        let mut evaluation = RuleEvaluation {
            parameters: EffectiveParameters::from_context(context),
            applied_rules: Vec::new(),
            skipped_rules: Vec::new(),
        };

        for rule_type in RuleType::ALL {
            if !plan_active && !(rule_type.is_discount() || rule_type == RuleType::CustomRule) {
                continue;
            }

            let rules = self.load_rules(rule_type, context).await?;
            let mut first_match_taken = false;

            for rule in self.compile_all(rules, &mut evaluation.skipped_rules) {
                if !rule.conditions.matches(context) {
                    continue;
                }

                let params = &mut evaluation.parameters;
                match &rule.effect {
                    RuleEffect::Coverage { percent } => {
                        params.coverage_percent = *percent;
                        first_match_taken = true;
                    }
                    RuleEffect::Deductible { amount } => {
                        params.deductible = Money::new(*amount, currency);
                        first_match_taken = true;
                    }
                    RuleEffect::Supplementary {
                        applicable,
                        coverage_percent,
                        max_payment,
                    } => {
                        if let Some(applicable) = applicable {
                            params.supplementary_applicable = *applicable;
                        }
                        if let Some(percent) = coverage_percent {
                            params.supplementary_coverage_percent = Some(*percent);
                        }
                        if let Some(max) = max_payment {
                            params.supplementary_max_payment = Some(Money::new(*max, currency));
                        }
                        first_match_taken = true;
                    }
                    RuleEffect::PaymentLimit {
                        insurer_max,
                        patient_max,
                    } => params.tighten_limit(
                        insurer_max.map(|d| Money::new(d, currency)),
                        patient_max.map(|d| Money::new(d, currency)),
                    ),
                    RuleEffect::Discount { percent } => params.add_discount(*percent),
                    RuleEffect::Custom { actions } => {
                        for action in actions {
                            if plan_active || matches!(action, RuleAction::DiscountPercent(_)) {
                                params.apply_action(action, currency);
                            }
                        }
                    }
                }

                debug!(rule_id = %rule.id, rule = %rule.name, rule_type = %rule.rule_type, "Rule applied");
                evaluation.applied_rules.push(AppliedRule {
                    id: rule.id,
                    name: rule.name.clone(),
                    rule_type: rule.rule_type,
                });

                if first_match_taken {
                    break;
                }
            }
        }

        Ok(evaluation)
    }

    async fn load_rules(
        &self,
        rule_type: RuleType,
        context: &CalculationContext,
    ) -> Result<Vec<BusinessRule>, TariffError> {
        let query = RuleQuery::new(rule_type, context.calculation_date)
            .for_plan(context.insurance_plan.id)
            .for_category(context.service.category_id);

        let fetch = self.repository.get_active_rules(&query);
        let fetched = match self.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(result) => result,
                Err(_) => Err(PortError::timeout(
                    format!("get_active_rules({})", rule_type),
                    limit.as_millis() as u64,
                )),
            },
            None => fetch.await,
        };

        let rules = fetched.map_err(|source| {
            warn!(rule_type = %rule_type, error = %source, "Rule store unavailable");
            TariffError::rule_store_unavailable(rule_type, source)
        })?;

        // Adapters filter already; re-check so a lax store cannot widen the scope
        let plan = &context.insurance_plan.id;
        let category = &context.service.category_id;
        let service = &context.service.id;
        let mut rules: Vec<BusinessRule> = rules
            .into_iter()
            .filter(|rule| query.accepts(rule) && rule.scope.matches(plan, category, service))
            .collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }

    fn compile_all(&self, rules: Vec<BusinessRule>, skipped: &mut Vec<SkippedRule>) -> Vec<CompiledRule> {
        rules
            .iter()
            .filter_map(|rule| match CompiledRule::compile(rule) {
                Ok(compiled) => Some(compiled),
                Err(error) => {
                    warn!(
                        rule_id = %rule.id,
                        rule = %rule.name,
                        error = %error,
                        "Skipping misconfigured business rule"
                    );
                    skipped.push(SkippedRule {
                        id: rule.id,
                        name: rule.name.clone(),
                        reason: error.to_string(),
                    });
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn irr(amount: Decimal) -> Money {
        Money::new(amount, Currency::IRR)
    }

    #[test]
    fn test_limit_tightens_to_lowest() {
        let mut limit = PaymentLimit::default();
        limit.tighten(Some(irr(dec!(500))), None);
        limit.tighten(Some(irr(dec!(300))), Some(irr(dec!(900))));
        limit.tighten(Some(irr(dec!(400))), None);
        assert_eq!(limit.insurer_max, Some(irr(dec!(300))));
        assert_eq!(limit.patient_max, Some(irr(dec!(900))));
    }

    #[test]
    fn test_limit_check_reports_insurer_first() {
        let limit = PaymentLimit {
            insurer_max: Some(irr(dec!(100))),
            patient_max: Some(irr(dec!(100))),
        };
        assert!(matches!(
            limit.check(irr(dec!(150)), irr(dec!(150))),
            Some(LimitViolation::Insurer { .. })
        ));
        assert!(limit.check(irr(dec!(100)), irr(dec!(100))).is_none());
    }

    #[test]
    fn test_discounts_saturate_at_hundred() {
        let mut params = EffectiveParameters::uninsured(Currency::IRR);
        params.add_discount(Percentage::new(dec!(60)).unwrap());
        params.add_discount(Percentage::new(dec!(70)).unwrap());
        assert_eq!(params.discount_percent, Some(Percentage::HUNDRED));
    }

    #[test]
    fn test_supplementary_percent_ignored_when_not_applicable() {
        let mut params = EffectiveParameters::uninsured(Currency::IRR);
        params.supplementary_coverage_percent = Some(Percentage::new(dec!(50)).unwrap());
        assert!(params.effective_supplementary_percent().is_zero());
        params.supplementary_applicable = true;
        assert_eq!(params.effective_supplementary_percent().value(), dec!(50));
    }
}
