//! PostgreSQL Rule Adapter
//!
//! Implements the domain's [`RuleRepository`] port on top of
//! [`BusinessRuleRepository`]. Rows that cannot be read as rules (an
//! unknown type name, a priority outside 1..=100) are logged and left out
//! rather than failing the whole fetch; their JSON payloads are checked
//! later by the engine.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError, ValidityWindow,
};
use domain_tariff::rules::{BusinessRule, RuleQuery, RuleRepository, RuleScope, RuleType};

use crate::error::DatabaseError;
use crate::repositories::rules::{BusinessRuleRepository, BusinessRuleRow};

const ADAPTER_ID: &str = "postgres-rule-adapter";

/// PostgreSQL-backed implementation of the rule store port
#[derive(Debug, Clone)]
pub struct PostgresRuleRepository {
    repository: BusinessRuleRepository,
    pool: PgPool,
}

impl PostgresRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BusinessRuleRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns the underlying row-level repository
    pub fn repository(&self) -> &BusinessRuleRepository {
        &self.repository
    }
}

impl DomainPort for PostgresRuleRepository {}

#[async_trait]
impl HealthCheckable for PostgresRuleRepository {
    /// Checks database connectivity with a `SELECT 1`
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl RuleRepository for PostgresRuleRepository {
    #[instrument(skip(self), fields(rule_type = %query.rule_type))]
    async fn get_active_rules(&self, query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
        let rows = self
            .repository
            .find_active(
                query.rule_type.as_str(),
                query.insurance_plan_id.map(Into::into),
                query.service_category_id.map(Into::into),
                query.as_of,
            )
            .await
            .map_err(PortError::from)?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let rule_id = row.rule_id;
            match row_to_rule(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!(%rule_id, error = %e, "Ignoring unreadable business rule row"),
            }
        }

        debug!(count = rules.len(), "Loaded business rules");
        Ok(rules)
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Converts a database row to a domain rule
fn row_to_rule(row: BusinessRuleRow) -> Result<BusinessRule, DatabaseError> {
    let rule_type: RuleType = row.rule_type.parse().map_err(DatabaseError::InvalidRow)?;
    let priority = u8::try_from(row.priority)
        .ok()
        .filter(|p| (1..=100).contains(p))
        .ok_or_else(|| DatabaseError::InvalidRow(format!("priority {} out of range", row.priority)))?;

    Ok(BusinessRule {
        id: row.rule_id.into(),
        name: row.name,
        rule_type,
        priority,
        conditions: row.conditions,
        actions: row.actions,
        is_active: row.is_active,
        scope: RuleScope {
            insurance_plan_id: row.insurance_plan_id.map(Into::into),
            service_category_id: row.service_category_id.map(Into::into),
            service_id: row.service_id.map(Into::into),
        },
        validity: ValidityWindow {
            start: row.valid_from,
            end: row.valid_to,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn row(rule_type: &str, priority: i16) -> BusinessRuleRow {
        BusinessRuleRow {
            rule_id: Uuid::from_u128(7),
            name: "Seniors".to_string(),
            rule_type: rule_type.to_string(),
            priority,
            conditions: "[]".to_string(),
            actions: r#"[{"type": "coverage_percent", "value": 90}]"#.to_string(),
            is_active: true,
            insurance_plan_id: Some(Uuid::from_u128(0x1001)),
            service_category_id: None,
            service_id: None,
            valid_from: None,
            valid_to: None,
        }
    }

    #[test]
    fn test_row_to_rule_maps_scope_and_type() {
        let rule = row_to_rule(row("CoveragePercent", 1)).unwrap();
        assert_eq!(rule.rule_type, RuleType::CoveragePercent);
        assert_eq!(rule.priority, 1);
        assert_eq!(
            rule.scope.insurance_plan_id.map(Uuid::from),
            Some(Uuid::from_u128(0x1001))
        );
        assert!(rule.scope.service_category_id.is_none());
        assert!(rule.validity.is_unbounded());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(matches!(
            row_to_rule(row("loyalty_bonus", 10)),
            Err(DatabaseError::InvalidRow(_))
        ));
    }

    #[test]
    fn test_priority_out_of_range_is_rejected() {
        assert!(row_to_rule(row("deductible", 0)).is_err());
        assert!(row_to_rule(row("deductible", 101)).is_err());
        assert!(row_to_rule(row("deductible", -3)).is_err());
    }
}
