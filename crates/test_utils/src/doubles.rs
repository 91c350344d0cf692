//! Rule store test doubles
//!
//! Stand-ins for the rule store port that fail, stall or count calls, for
//! exercising the engine's error paths without a database.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_tariff::rules::{BusinessRule, InMemoryRuleRepository, RuleQuery, RuleRepository};

/// A store whose every fetch fails with a connection error
#[derive(Debug, Default)]
pub struct FailingRuleRepository;

impl DomainPort for FailingRuleRepository {}

#[async_trait]
impl RuleRepository for FailingRuleRepository {
    async fn get_active_rules(&self, _query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
        Err(PortError::connection("rule store is down"))
    }
}

#[async_trait]
impl HealthCheckable for FailingRuleRepository {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "failing-rules".to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms: 0,
            message: Some("rule store is down".to_string()),
            checked_at: chrono::Utc::now(),
        }
    }
}

/// A store that answers only after a delay
#[derive(Debug)]
pub struct SlowRuleRepository {
    delay: Duration,
    inner: InMemoryRuleRepository,
}

impl SlowRuleRepository {
    pub fn new(delay: Duration, rules: Vec<BusinessRule>) -> Self {
        Self {
            delay,
            inner: InMemoryRuleRepository::new(rules),
        }
    }
}

impl DomainPort for SlowRuleRepository {}

#[async_trait]
impl RuleRepository for SlowRuleRepository {
    async fn get_active_rules(&self, query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_active_rules(query).await
    }
}

#[async_trait]
impl HealthCheckable for SlowRuleRepository {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

/// A store that returns its rules unfiltered and counts fetches
///
/// Handy for checking that the engine re-applies scope and validity itself.
#[derive(Debug, Default)]
pub struct UnfilteredRuleRepository {
    rules: Vec<BusinessRule>,
    calls: Arc<AtomicUsize>,
}

impl UnfilteredRuleRepository {
    pub fn new(rules: Vec<BusinessRule>) -> Self {
        Self {
            rules,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for UnfilteredRuleRepository {}

#[async_trait]
impl RuleRepository for UnfilteredRuleRepository {
    async fn get_active_rules(&self, query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rules
            .iter()
            .filter(|rule| rule.rule_type == query.rule_type)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HealthCheckable for UnfilteredRuleRepository {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("unfiltered-rules", format!("{} rules", self.rules.len()))
    }
}
