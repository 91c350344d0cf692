//! Dynamic coverage rules
//!
//! Clinics adjust coverage, deductibles, ceilings, supplementary stacking and
//! discounts through data held in a rule store. This module holds the rule
//! model, the condition and action language, the engine that applies them,
//! the store port and its in-process adapters.

pub mod model;
pub mod condition;
pub mod action;
pub mod engine;
pub mod ports;
pub mod adapters;
pub mod cache;

pub use model::{BusinessRule, RuleScope, RuleType};
pub use condition::{Condition, ConditionField, ConditionSet, MatchMode, Operator, RawCondition};
pub use action::{CompiledRule, RawAction, RuleAction, RuleConfigError, RuleEffect};
pub use engine::{
    AppliedRule, BusinessRuleEngine, EffectiveParameters, LimitViolation, PaymentLimit,
    RuleEvaluation, SkippedRule,
};
pub use ports::{RuleQuery, RuleRepository};
pub use adapters::InMemoryRuleRepository;
pub use cache::{CachingRuleRepository, MAX_RULE_CACHE_TTL};
