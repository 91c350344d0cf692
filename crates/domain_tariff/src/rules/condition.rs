//! Rule conditions and their evaluation against a calculation context
//!
//! A condition is `{field, operator, value}`. A rule's conditions are stored
//! either as a plain array, where every condition must hold, or as a group
//! `{"match": "all" | "any", "conditions": [...]}`.
//!
//! Evaluation never fails. A condition naming an unknown field or operator,
//! or carrying a value that cannot be read for its field, is simply false.
//! Only a condition payload that is not valid JSON at all is reported, at
//! compile time, so the engine can skip the whole rule.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{InsurancePlanId, ServiceCategoryId, ServiceId};

use crate::context::{CalculationContext, Gender};

/// Context attribute a condition reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionField {
    ServiceAmount,
    PatientAge,
    PatientGender,
    ServiceCategory,
    ServiceId,
    InsurancePlan,
    CalculationDate,
    HasSupplementary,
    Unknown(String),
}

impl From<&str> for ConditionField {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "service_amount" | "amount" => ConditionField::ServiceAmount,
            "patient_age" | "age" => ConditionField::PatientAge,
            "patient_gender" | "gender" => ConditionField::PatientGender,
            "service_category" | "service_category_id" => ConditionField::ServiceCategory,
            "service_id" => ConditionField::ServiceId,
            "insurance_plan" | "insurance_plan_id" => ConditionField::InsurancePlan,
            "calculation_date" => ConditionField::CalculationDate,
            "has_supplementary" => ConditionField::HasSupplementary,
            _ => ConditionField::Unknown(s.to_string()),
        }
    }
}

/// Comparison applied between the context value and the condition value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    In,
    NotIn,
    Unknown(String),
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "==" => Operator::Equals,
            "not_equals" | "ne" | "!=" => Operator::NotEquals,
            "greater_than" | "gt" | ">" => Operator::GreaterThan,
            "greater_than_or_equal" | "gte" | ">=" => Operator::GreaterThanOrEqual,
            "less_than" | "lt" | "<" => Operator::LessThan,
            "less_than_or_equal" | "lte" | "<=" => Operator::LessThanOrEqual,
            "between" => Operator::Between,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            _ => Operator::Unknown(s.to_string()),
        }
    }
}

/// Condition as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCondition {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

/// How the conditions of a set combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedConditions {
    List(Vec<RawCondition>),
    Group {
        #[serde(default, rename = "match")]
        mode: MatchMode,
        conditions: Vec<RawCondition>,
    },
}

/// One parsed condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: ConditionField,
    pub operator: Operator,
    pub value: Value,
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        Self {
            field: ConditionField::from(raw.field.as_str()),
            operator: Operator::from(raw.operator.as_str()),
            value: raw.value,
        }
    }
}

/// The conditions of one rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionSet {
    pub mode: MatchMode,
    pub conditions: Vec<Condition>,
}

impl ConditionSet {
    /// Parses the persisted condition text; blank text means no conditions
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let persisted: PersistedConditions = serde_json::from_str(text)?;
        let (mode, raw) = match persisted {
            PersistedConditions::List(list) => (MatchMode::All, list),
            PersistedConditions::Group { mode, conditions } => (mode, conditions),
        };
        Ok(Self {
            mode,
            conditions: raw.into_iter().map(Condition::from).collect(),
        })
    }

    /// Returns true if the set holds for the context; an empty set always does
    pub fn matches(&self, context: &CalculationContext) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.mode {
            MatchMode::All => self.conditions.iter().all(|c| c.evaluate(context)),
            MatchMode::Any => self.conditions.iter().any(|c| c.evaluate(context)),
        }
    }
}

/// A context attribute, typed for comparison
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Number(Decimal),
    Gender(Gender),
    Id(Uuid),
    Date(NaiveDate),
    Flag(bool),
}

impl Condition {
    /// Evaluates this condition; anything unreadable yields false
    pub fn evaluate(&self, context: &CalculationContext) -> bool {
        let Some(actual) = self.read_field(context) else {
            return false;
        };
        let expect_one = || self.coerce(&self.value, &actual);
        let expect_many = || -> Option<Vec<FieldValue>> {
            list_items(&self.value)
                .iter()
                .map(|item| self.coerce(item, &actual))
                .collect()
        };

        match &self.operator {
            Operator::Equals => expect_one().is_some_and(|v| v == actual),
            Operator::NotEquals => expect_one().is_some_and(|v| v != actual),
            Operator::GreaterThan => compare(&actual, expect_one()).is_some_and(|o| o.is_gt()),
            Operator::GreaterThanOrEqual => {
                compare(&actual, expect_one()).is_some_and(|o| o.is_ge())
            }
            Operator::LessThan => compare(&actual, expect_one()).is_some_and(|o| o.is_lt()),
            Operator::LessThanOrEqual => compare(&actual, expect_one()).is_some_and(|o| o.is_le()),
            Operator::Between => match expect_many().as_deref() {
                Some([min, max]) => {
                    compare(&actual, Some(min.clone())).is_some_and(|o| o.is_ge())
                        && compare(&actual, Some(max.clone())).is_some_and(|o| o.is_le())
                }
                _ => false,
            },
            Operator::In => expect_many().is_some_and(|items| items.contains(&actual)),
            Operator::NotIn => expect_many().is_some_and(|items| !items.contains(&actual)),
            Operator::Unknown(_) => false,
        }
    }

    fn read_field(&self, context: &CalculationContext) -> Option<FieldValue> {
        Some(match &self.field {
            ConditionField::ServiceAmount => FieldValue::Number(context.tariff_price()),
            ConditionField::PatientAge => FieldValue::Number(Decimal::from(context.patient.age)),
            ConditionField::PatientGender => FieldValue::Gender(context.patient.gender),
            ConditionField::ServiceCategory => {
                FieldValue::Id(*context.service.category_id.as_uuid())
            }
            ConditionField::ServiceId => FieldValue::Id(*context.service.id.as_uuid()),
            ConditionField::InsurancePlan => FieldValue::Id(*context.insurance_plan.id.as_uuid()),
            ConditionField::CalculationDate => FieldValue::Date(context.calculation_date),
            ConditionField::HasSupplementary => {
                FieldValue::Flag(context.active_supplementary().is_some())
            }
            ConditionField::Unknown(_) => return None,
        })
    }

    /// Reads a persisted value as the same kind as the context attribute
    fn coerce(&self, value: &Value, like: &FieldValue) -> Option<FieldValue> {
        match like {
            FieldValue::Number(_) => decimal_from_value(value).map(FieldValue::Number),
            FieldValue::Gender(_) => value.as_str()?.parse().ok().map(FieldValue::Gender),
            FieldValue::Date(_) => NaiveDate::parse_from_str(value.as_str()?.trim(), "%Y-%m-%d")
                .ok()
                .map(FieldValue::Date),
            FieldValue::Flag(_) => match value {
                Value::Bool(b) => Some(FieldValue::Flag(*b)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Some(FieldValue::Flag(true)),
                    "false" | "0" | "no" => Some(FieldValue::Flag(false)),
                    _ => None,
                },
                Value::Number(n) => n.as_i64().map(|n| FieldValue::Flag(n != 0)),
                _ => None,
            },
            FieldValue::Id(_) => {
                let text = value.as_str()?.trim();
                let uuid = match self.field {
                    ConditionField::ServiceCategory => {
                        text.parse::<ServiceCategoryId>().ok().map(Uuid::from)
                    }
                    ConditionField::ServiceId => text.parse::<ServiceId>().ok().map(Uuid::from),
                    ConditionField::InsurancePlan => {
                        text.parse::<InsurancePlanId>().ok().map(Uuid::from)
                    }
                    _ => None,
                }?;
                Some(FieldValue::Id(uuid))
            }
        }
    }
}

fn compare(actual: &FieldValue, expected: Option<FieldValue>) -> Option<std::cmp::Ordering> {
    match (actual, expected?) {
        (FieldValue::Number(a), FieldValue::Number(b)) => Some(a.cmp(&b)),
        (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(&b)),
        _ => None,
    }
}

/// Splits a list value: a JSON array or a comma separated string
fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Reads a decimal from a JSON number or numeric string
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
