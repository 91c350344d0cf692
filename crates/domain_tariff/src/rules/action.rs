//! Rule actions and rule compilation
//!
//! Actions are stored as `[{"type": "...", "value": ...}]`. Each rule type
//! accepts a fixed set of action types; compiling a rule checks that set,
//! parses every value and yields a closed [`RuleEffect`] the engine can apply
//! without looking at JSON again.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use core_kernel::{Percentage, RuleId};

use super::condition::{decimal_from_value, ConditionSet};
use super::model::{BusinessRule, RuleType};

/// Why a rule could not be compiled
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleConfigError {
    #[error("Conditions are not valid JSON: {0}")]
    MalformedConditions(String),

    #[error("Actions are not valid JSON: {0}")]
    MalformedActions(String),

    #[error("Unknown action type '{0}'")]
    UnknownActionType(String),

    #[error("Invalid value {value} for action '{action}'")]
    InvalidActionValue { action: String, value: String },

    #[error("Rule type {rule_type} requires {expected}")]
    MissingAction {
        rule_type: RuleType,
        expected: &'static str,
    },

    #[error("Action '{action}' is not allowed on rule type {rule_type}")]
    UnexpectedAction { rule_type: RuleType, action: String },

    #[error("Action '{0}' appears more than once")]
    DuplicateAction(String),

    #[error("Priority {0} is outside 1..=100")]
    InvalidPriority(u8),
}

/// Action as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub value: Value,
}

/// A parsed action; amounts are in the calculation currency's major unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    CoveragePercent(Percentage),
    Deductible(Decimal),
    MaxInsurerPayment(Decimal),
    MaxPatientPayment(Decimal),
    DiscountPercent(Percentage),
    SupplementaryCoveragePercent(Percentage),
    SupplementaryMaxPayment(Decimal),
    SupplementaryApplicable(bool),
}

impl RuleAction {
    pub fn name(&self) -> &'static str {
        match self {
            RuleAction::CoveragePercent(_) => "coverage_percent",
            RuleAction::Deductible(_) => "deductible",
            RuleAction::MaxInsurerPayment(_) => "max_insurer_payment",
            RuleAction::MaxPatientPayment(_) => "max_patient_payment",
            RuleAction::DiscountPercent(_) => "discount_percent",
            RuleAction::SupplementaryCoveragePercent(_) => "supplementary_coverage_percent",
            RuleAction::SupplementaryMaxPayment(_) => "supplementary_max_payment",
            RuleAction::SupplementaryApplicable(_) => "supplementary_applicable",
        }
    }

    /// Parses one persisted action, validating its value
    pub fn parse(raw: &RawAction) -> Result<Self, RuleConfigError> {
        let kind = raw.action_type.trim().to_ascii_lowercase();
        let invalid = || RuleConfigError::InvalidActionValue {
            action: kind.clone(),
            value: raw.value.to_string(),
        };
        let percent = || {
            decimal_from_value(&raw.value)
                .and_then(|d| Percentage::new(d).ok())
                .ok_or_else(invalid)
        };
        let amount = || {
            decimal_from_value(&raw.value)
                .filter(|d| !d.is_sign_negative())
                .ok_or_else(invalid)
        };

        match kind.as_str() {
            "coverage_percent" => percent().map(RuleAction::CoveragePercent),
            "deductible" => amount().map(RuleAction::Deductible),
            "max_insurer_payment" => amount().map(RuleAction::MaxInsurerPayment),
            "max_patient_payment" => amount().map(RuleAction::MaxPatientPayment),
            "discount_percent" => percent().map(RuleAction::DiscountPercent),
            "supplementary_coverage_percent" => {
                percent().map(RuleAction::SupplementaryCoveragePercent)
            }
            "supplementary_max_payment" => amount().map(RuleAction::SupplementaryMaxPayment),
            "supplementary_applicable" => match &raw.value {
                Value::Bool(b) => Ok(RuleAction::SupplementaryApplicable(*b)),
                Value::String(s) if s.eq_ignore_ascii_case("true") => {
                    Ok(RuleAction::SupplementaryApplicable(true))
                }
                Value::String(s) if s.eq_ignore_ascii_case("false") => {
                    Ok(RuleAction::SupplementaryApplicable(false))
                }
                _ => Err(invalid()),
            },
            _ => Err(RuleConfigError::UnknownActionType(raw.action_type.clone())),
        }
    }
}

/// What a compiled rule does when its conditions hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleEffect {
    Coverage {
        percent: Percentage,
    },
    Deductible {
        amount: Decimal,
    },
    PaymentLimit {
        insurer_max: Option<Decimal>,
        patient_max: Option<Decimal>,
    },
    Supplementary {
        applicable: Option<bool>,
        coverage_percent: Option<Percentage>,
        max_payment: Option<Decimal>,
    },
    Discount {
        percent: Percentage,
    },
    Custom {
        actions: Vec<RuleAction>,
    },
}

impl RuleEffect {
    /// Builds the effect for a rule type from its parsed actions
    pub fn from_actions(rule_type: RuleType, actions: Vec<RuleAction>) -> Result<Self, RuleConfigError> {
        let slots = ActionSlots::new(rule_type);

        match rule_type {
            RuleType::CoveragePercent => {
                let mut percent = None;
                for action in actions {
                    match action {
                        RuleAction::CoveragePercent(p) => slots.fill(&mut percent, "coverage_percent", p)?,
                        other => return Err(slots.unexpected(&other)),
                    }
                }
                Ok(RuleEffect::Coverage {
                    percent: slots.require(percent, "a coverage_percent action")?,
                })
            }
            RuleType::Deductible => {
                let mut amount = None;
                for action in actions {
                    match action {
                        RuleAction::Deductible(d) => slots.fill(&mut amount, "deductible", d)?,
                        other => return Err(slots.unexpected(&other)),
                    }
                }
                Ok(RuleEffect::Deductible {
                    amount: slots.require(amount, "a deductible action")?,
                })
            }
            RuleType::PaymentLimit => {
                let (mut insurer_max, mut patient_max) = (None, None);
                for action in actions {
                    match action {
                        RuleAction::MaxInsurerPayment(d) => {
                            slots.fill(&mut insurer_max, "max_insurer_payment", d)?
                        }
                        RuleAction::MaxPatientPayment(d) => {
                            slots.fill(&mut patient_max, "max_patient_payment", d)?
                        }
                        other => return Err(slots.unexpected(&other)),
                    }
                }
                if insurer_max.is_none() && patient_max.is_none() {
                    return Err(slots.missing("a max_insurer_payment or max_patient_payment action"));
                }
                Ok(RuleEffect::PaymentLimit {
                    insurer_max,
                    patient_max,
                })
            }
            RuleType::SupplementaryInsurance => {
                let (mut applicable, mut coverage_percent, mut max_payment) = (None, None, None);
                for action in actions {
                    match action {
                        RuleAction::SupplementaryApplicable(b) => {
                            slots.fill(&mut applicable, "supplementary_applicable", b)?
                        }
                        RuleAction::SupplementaryCoveragePercent(p) => {
                            slots.fill(&mut coverage_percent, "supplementary_coverage_percent", p)?
                        }
                        RuleAction::SupplementaryMaxPayment(d) => {
                            slots.fill(&mut max_payment, "supplementary_max_payment", d)?
                        }
                        other => return Err(slots.unexpected(&other)),
                    }
                }
                if applicable.is_none() && coverage_percent.is_none() && max_payment.is_none() {
                    return Err(slots.missing("a supplementary action"));
                }
                Ok(RuleEffect::Supplementary {
                    applicable,
                    coverage_percent,
                    max_payment,
                })
            }
            RuleType::AgeBasedDiscount
            | RuleType::GenderBasedDiscount
            | RuleType::ServiceBasedDiscount
            | RuleType::InsuranceBasedDiscount => {
                let mut percent = None;
                for action in actions {
                    match action {
                        RuleAction::DiscountPercent(p) => slots.fill(&mut percent, "discount_percent", p)?,
                        other => return Err(slots.unexpected(&other)),
                    }
                }
                Ok(RuleEffect::Discount {
                    percent: slots.require(percent, "a discount_percent action")?,
                })
            }
            RuleType::CustomRule => {
                if actions.is_empty() {
                    return Err(slots.missing("at least one action"));
                }
                Ok(RuleEffect::Custom { actions })
            }
        }
    }
}

struct ActionSlots {
    rule_type: RuleType,
}

impl ActionSlots {
    fn new(rule_type: RuleType) -> Self {
        Self { rule_type }
    }

    fn fill<T>(&self, slot: &mut Option<T>, name: &str, value: T) -> Result<(), RuleConfigError> {
        if slot.is_some() {
            return Err(RuleConfigError::DuplicateAction(name.to_string()));
        }
        *slot = Some(value);
        Ok(())
    }

    fn require<T>(&self, slot: Option<T>, expected: &'static str) -> Result<T, RuleConfigError> {
        slot.ok_or_else(|| self.missing(expected))
    }

    fn missing(&self, expected: &'static str) -> RuleConfigError {
        RuleConfigError::MissingAction {
            rule_type: self.rule_type,
            expected,
        }
    }

    fn unexpected(&self, action: &RuleAction) -> RuleConfigError {
        RuleConfigError::UnexpectedAction {
            rule_type: self.rule_type,
            action: action.name().to_string(),
        }
    }
}

/// A rule ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: RuleId,
    pub name: String,
    pub rule_type: RuleType,
    pub priority: u8,
    pub conditions: ConditionSet,
    pub effect: RuleEffect,
}

impl CompiledRule {
    /// Parses conditions and actions of a stored rule
    pub fn compile(rule: &BusinessRule) -> Result<Self, RuleConfigError> {
        if !(1..=100).contains(&rule.priority) {
            return Err(RuleConfigError::InvalidPriority(rule.priority));
        }

        let conditions = ConditionSet::parse(&rule.conditions)
            .map_err(|e| RuleConfigError::MalformedConditions(e.to_string()))?;

        let raw: Vec<RawAction> = serde_json::from_str(&rule.actions)
            .map_err(|e| RuleConfigError::MalformedActions(e.to_string()))?;
        let actions = raw
            .iter()
            .map(RuleAction::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: rule.id,
            name: rule.name.clone(),
            rule_type: rule.rule_type,
            priority: rule.priority,
            conditions,
            effect: RuleEffect::from_actions(rule.rule_type, actions)?,
        })
    }
}
