//! Rule store port
//!
//! The engine reads rules through this trait only. Adapters exist for the
//! clinic's PostgreSQL database (in `infra_db`), for a JSON file or an
//! in-memory list, and a TTL cache decorating either.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, HealthCheckable, InsurancePlanId, PortError, ServiceCategoryId};

use super::model::{BusinessRule, RuleType};

/// Filter for one rule fetch
///
/// A rule matches when it has the requested type, is active, is valid on
/// `as_of`, and its plan and category scope are either unset or equal to
/// the requested ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleQuery {
    pub rule_type: RuleType,
    pub insurance_plan_id: Option<InsurancePlanId>,
    pub service_category_id: Option<ServiceCategoryId>,
    pub as_of: NaiveDate,
}

impl RuleQuery {
    pub fn new(rule_type: RuleType, as_of: NaiveDate) -> Self {
        Self {
            rule_type,
            insurance_plan_id: None,
            service_category_id: None,
            as_of,
        }
    }

    pub fn for_plan(mut self, plan: InsurancePlanId) -> Self {
        self.insurance_plan_id = Some(plan);
        self
    }

    pub fn for_category(mut self, category: ServiceCategoryId) -> Self {
        self.service_category_id = Some(category);
        self
    }

    /// Applies this filter to a rule held in memory
    pub fn accepts(&self, rule: &BusinessRule) -> bool {
        let scope_ok = |wanted: Option<_>, held: Option<_>| match (wanted, held) {
            (_, None) => true,
            (Some(w), Some(h)) => w == h,
            (None, Some(_)) => false,
        };

        rule.rule_type == self.rule_type
            && rule.is_effective_on(self.as_of)
            && scope_ok(
                self.insurance_plan_id.map(uuid::Uuid::from),
                rule.scope.insurance_plan_id.map(uuid::Uuid::from),
            )
            && scope_ok(
                self.service_category_id.map(uuid::Uuid::from),
                rule.scope.service_category_id.map(uuid::Uuid::from),
            )
    }
}

/// Read-only access to the business rule store
#[async_trait]
pub trait RuleRepository: DomainPort + HealthCheckable {
    /// Returns the active rules matching the query, in any order
    async fn get_active_rules(&self, query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError>;
}
