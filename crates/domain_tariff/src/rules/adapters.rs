//! In-process rule store adapter
//!
//! Holds rules in memory, loaded from a JSON document or handed over
//! directly. Used by clinics that keep their rules in a file next to the
//! service, and by tests. Filtering is identical to the SQL adapter.
//!
//! The JSON document is either a bare array of rules or `{"rules": [...]}`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};

use super::model::BusinessRule;
use super::ports::{RuleQuery, RuleRepository};

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    List(Vec<BusinessRule>),
    Wrapped { rules: Vec<BusinessRule> },
}

/// Rule store backed by a vector in memory
#[derive(Debug, Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<Vec<BusinessRule>>,
}

impl InMemoryRuleRepository {
    pub fn new(rules: Vec<BusinessRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Parses a rule document
    pub fn from_json_str(json: &str) -> Result<Self, PortError> {
        let document: RuleDocument = serde_json::from_str(json)
            .map_err(|e| PortError::transformation(format!("invalid rule document: {}", e)))?;
        let rules = match document {
            RuleDocument::List(rules) | RuleDocument::Wrapped { rules } => rules,
        };
        Ok(Self::new(rules))
    }

    /// Reads and parses a rule document from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PortError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| PortError::Internal {
            message: format!("cannot read rule file {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        let repository = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            rules = repository.len().await,
            "Loaded business rules from file"
        );
        Ok(repository)
    }

    /// Replaces every rule, e.g. after the file was edited
    pub async fn replace_all(&self, rules: Vec<BusinessRule>) {
        *self.rules.write().await = rules;
    }

    pub async fn insert(&self, rule: BusinessRule) {
        self.rules.write().await.push(rule);
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

impl DomainPort for InMemoryRuleRepository {}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    #[instrument(skip(self), fields(rule_type = %query.rule_type))]
    async fn get_active_rules(&self, query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
        let rules: Vec<BusinessRule> = self
            .rules
            .read()
            .await
            .iter()
            .filter(|rule| query.accepts(rule))
            .cloned()
            .collect();
        debug!(count = rules.len(), "Rules selected");
        Ok(rules)
    }
}

#[async_trait]
impl HealthCheckable for InMemoryRuleRepository {
    async fn health_check(&self) -> HealthCheckResult {
        let count = self.len().await;
        HealthCheckResult::healthy("in-memory-rules", format!("{} rules loaded", count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::RuleType;
    use chrono::NaiveDate;

    const DOCUMENT: &str = r#"{
        "rules": [
            {
                "id": "00000000-0000-0000-0000-000000000001",
                "name": "Base coverage",
                "rule_type": "coverage_percent",
                "priority": 10,
                "conditions": [],
                "actions": [{"type": "coverage_percent", "value": 70}]
            },
            {
                "id": "00000000-0000-0000-0000-000000000002",
                "name": "Retired",
                "rule_type": "coverage_percent",
                "priority": 1,
                "conditions": [],
                "actions": [{"type": "coverage_percent", "value": 90}],
                "is_active": false
            },
            {
                "id": "00000000-0000-0000-0000-000000000003",
                "name": "Nowruz",
                "rule_type": "age_based_discount",
                "priority": 1,
                "conditions": [],
                "actions": [{"type": "discount_percent", "value": 5}],
                "validity": {"start": "2025-03-21", "end": "2025-04-02"}
            }
        ]
    }"#;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_loads_wrapped_document() {
        let repo = InMemoryRuleRepository::from_json_str(DOCUMENT).unwrap();
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_filters_inactive_and_out_of_window() {
        let repo = InMemoryRuleRepository::from_json_str(DOCUMENT).unwrap();

        let coverage = repo
            .get_active_rules(&RuleQuery::new(RuleType::CoveragePercent, day(2025, 1, 1)))
            .await
            .unwrap();
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].name, "Base coverage");

        let winter = repo
            .get_active_rules(&RuleQuery::new(RuleType::AgeBasedDiscount, day(2025, 1, 1)))
            .await
            .unwrap();
        assert!(winter.is_empty());

        let spring = repo
            .get_active_rules(&RuleQuery::new(RuleType::AgeBasedDiscount, day(2025, 4, 2)))
            .await
            .unwrap();
        assert_eq!(spring.len(), 1);
    }

    #[test]
    fn test_rejects_garbage_document() {
        let err = InMemoryRuleRepository::from_json_str("{\"rules\": 3}").unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }

    #[tokio::test]
    async fn test_health_reports_rule_count() {
        let repo = InMemoryRuleRepository::from_json_str(DOCUMENT).unwrap();
        let health = repo.health_check().await;
        assert!(health.is_healthy());
        assert_eq!(health.message.as_deref(), Some("3 rules loaded"));
    }
}
