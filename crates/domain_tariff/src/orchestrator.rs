//! Insurance tariff orchestrator
//!
//! The single entry point reception and billing call. One calculation runs:
//!
//! 1. the rule engine, producing effective parameters;
//! 2. the summed discount, taken off the tariff price;
//! 3. the share calculator, in manual mode when reception supplied
//!    percentages and in automatic mode otherwise;
//! 4. the payment-limit check against the final shares.
//!
//! Bad input and exceeded limits yield an invalid [`ShareResult`]; only an
//! unreachable rule store is returned as an error.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use core_kernel::{CalculationId, Money, Percentage};

use crate::context::CalculationContext;
use crate::error::TariffError;
use crate::messages::{limit_violation_message, share_error_message, Locale};
use crate::result::{FailureKind, ShareResult};
use crate::rules::{BusinessRuleEngine, EffectiveParameters, RuleEvaluation, RuleRepository};
use crate::share::{AutomaticShareRequest, ManualShareRequest, ShareCalculator, ShareRequest};

/// Composes rule evaluation, discounting, share calculation and limit checks
#[derive(Clone)]
pub struct InsuranceTariffOrchestrator {
    engine: BusinessRuleEngine,
    calculator: ShareCalculator,
    locale: Locale,
}

impl InsuranceTariffOrchestrator {
    pub fn new(engine: BusinessRuleEngine, calculator: ShareCalculator) -> Self {
        Self {
            engine,
            calculator,
            locale: Locale::default(),
        }
    }

    /// Orchestrator over a rule store with the default engine settings
    pub fn with_repository(repository: Arc<dyn RuleRepository>, calculator: ShareCalculator) -> Self {
        Self::new(BusinessRuleEngine::new(repository), calculator)
    }

    /// Sets the language of failure messages
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn engine(&self) -> &BusinessRuleEngine {
        &self.engine
    }

    pub fn calculator(&self) -> &ShareCalculator {
        &self.calculator
    }

    /// Calculates the split with messages in the configured language
    pub async fn calculate(&self, context: &CalculationContext) -> Result<ShareResult, TariffError> {
        self.calculate_localized(context, self.locale).await
    }

    /// Calculates the split with messages in the given language
    pub async fn calculate_localized(
        &self,
        context: &CalculationContext,
        locale: Locale,
    ) -> Result<ShareResult, TariffError> {
        let calculation_id = CalculationId::new_ordered();
        let span = info_span!(
            "share_calculation",
            calculation_id = %calculation_id,
            plan = %context.insurance_plan.id,
            service = %context.service.id,
            manual = context.is_manual()
        );

        async move {
            let evaluation = self.engine.evaluate(context).await?;
            let result = self.build_result(calculation_id, context, evaluation, locale);
            if result.is_valid {
                info!(
                    patient_share = %result.patient_share,
                    insurer_share = %result.insurer_share,
                    rules_applied = result.applied_rules.len(),
                    "Share calculated"
                );
            } else {
                warn!(
                    failure = ?result.failure_kind,
                    reason = result.error_message.as_deref().unwrap_or_default(),
                    "Share calculation rejected"
                );
            }
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Calculates the split from parameters the caller already holds
    ///
    /// No rule store access; the applied-rule trail is empty.
    pub fn calculate_with_parameters(
        &self,
        context: &CalculationContext,
        parameters: EffectiveParameters,
    ) -> ShareResult {
        let evaluation = RuleEvaluation {
            parameters,
            applied_rules: Vec::new(),
            skipped_rules: Vec::new(),
        };
        self.build_result(CalculationId::new_ordered(), context, evaluation, self.locale)
    }

    fn build_result(
        &self,
        calculation_id: CalculationId,
        context: &CalculationContext,
        evaluation: RuleEvaluation,
        locale: Locale,
    ) -> ShareResult {
        let RuleEvaluation {
            parameters,
            applied_rules,
            skipped_rules,
        } = evaluation;
        let policy = self.calculator.policy();
        let original_price = context.service.amount;
        let currency = original_price.currency();

        let discount = parameters.discount_percent.unwrap_or(Percentage::ZERO);
        let rounded_price = policy.round_currency(original_price.amount());
        let discount_amount = Money::new(policy.round_currency(discount.of(rounded_price)), currency);
        let discounted_price = Money::new(rounded_price - discount_amount.amount(), currency);

        let mut result = if rounded_price > Decimal::ZERO && discounted_price.is_zero() {
            ShareResult::fully_discounted(calculation_id, original_price, discount_amount)
        } else {
            let request = match context.manual_shares {
                Some(manual) => ShareRequest::Manual(ManualShareRequest {
                    tariff_price: discounted_price,
                    patient_percent: manual.patient_percent,
                    insurer_percent: manual.insurer_percent,
                }),
                None => ShareRequest::Automatic(AutomaticShareRequest {
                    tariff_price: discounted_price,
                    deductible: parameters.deductible,
                    primary_coverage_percent: parameters.coverage_percent.value(),
                    supplementary_coverage_percent: parameters
                        .effective_supplementary_percent()
                        .value(),
                    supplementary_max_payment: if parameters.supplementary_applicable {
                        parameters.supplementary_max_payment
                    } else {
                        None
                    },
                }),
            };

            match self.calculator.calculate(&request) {
                Ok(breakdown) => {
                    let limit_violation = parameters
                        .payment_limit
                        .and_then(|limit| limit.check(breakdown.insurer_share, breakdown.patient_share));
                    match limit_violation {
                        Some(violation) => ShareResult::invalid(
                            calculation_id,
                            original_price,
                            discount_amount,
                            breakdown.tariff_price,
                            FailureKind::PaymentLimitExceeded,
                            limit_violation_message(&violation, locale),
                        ),
                        None => ShareResult::from_breakdown(
                            calculation_id,
                            original_price,
                            discount_amount,
                            breakdown,
                        ),
                    }
                }
                Err(error) => ShareResult::invalid(
                    calculation_id,
                    original_price,
                    discount_amount,
                    discounted_price,
                    FailureKind::from(&error),
                    share_error_message(&error, locale),
                ),
            }
        };

        result.applied_rules = applied_rules;
        result.skipped_rules = skipped_rules;
        result
    }
}
