//! TTL cache in front of a rule store
//!
//! Rules change rarely but are read for every calculation, nine rule types
//! at a time. This decorator keeps each query's answer for a bounded time.
//! Failed fetches are never cached.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};

use super::model::BusinessRule;
use super::ports::{RuleQuery, RuleRepository};

/// Longest time a cached answer may be served
pub const MAX_RULE_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    rules: Vec<BusinessRule>,
    fetched_at: Instant,
}

/// Caching decorator for any [`RuleRepository`]
pub struct CachingRuleRepository {
    inner: Arc<dyn RuleRepository>,
    ttl: Duration,
    entries: RwLock<HashMap<RuleQuery, CacheEntry>>,
}

impl CachingRuleRepository {
    /// Wraps a store; a TTL above [`MAX_RULE_CACHE_TTL`] is clamped to it
    pub fn new(inner: Arc<dyn RuleRepository>, ttl: Duration) -> Self {
        let ttl = if ttl > MAX_RULE_CACHE_TTL {
            warn!(
                requested_secs = ttl.as_secs(),
                max_secs = MAX_RULE_CACHE_TTL.as_secs(),
                "Rule cache TTL clamped"
            );
            MAX_RULE_CACHE_TTL
        } else {
            ttl
        };
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drops every cached answer
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
        debug!("Rule cache invalidated");
    }

    pub async fn cached_queries(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl DomainPort for CachingRuleRepository {}

#[async_trait]
impl RuleRepository for CachingRuleRepository {
    async fn get_active_rules(&self, query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
        if let Some(entry) = self.entries.read().await.get(query) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!(rule_type = %query.rule_type, "Rule cache hit");
                return Ok(entry.rules.clone());
            }
        }

        let rules = self.inner.get_active_rules(query).await?;
        let mut entries = self.entries.write().await;
        // Every miss sweeps expired answers so the map only holds live queries.
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "Expired rule cache entries evicted");
        }
        entries.insert(
            query.clone(),
            CacheEntry {
                rules: rules.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(rules)
    }
}

#[async_trait]
impl HealthCheckable for CachingRuleRepository {
    async fn health_check(&self) -> HealthCheckResult {
        let mut result = self.inner.health_check().await;
        result.adapter_id = format!("cached:{}", result.adapter_id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::RuleType;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRepository {
        calls: AtomicUsize,
    }

    impl DomainPort for CountingRepository {}

    #[async_trait]
    impl RuleRepository for CountingRepository {
        async fn get_active_rules(&self, _query: &RuleQuery) -> Result<Vec<BusinessRule>, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl HealthCheckable for CountingRepository {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("counting", "ok")
        }
    }

    fn query() -> RuleQuery {
        RuleQuery::new(
            RuleType::Deductible,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let inner = Arc::new(CountingRepository::default());
        let cache = CachingRuleRepository::new(inner.clone(), Duration::from_secs(60));

        cache.get_active_rules(&query()).await.unwrap();
        cache.get_active_rules(&query()).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let inner = Arc::new(CountingRepository::default());
        let cache = CachingRuleRepository::new(inner.clone(), Duration::from_millis(20));

        cache.get_active_rules(&query()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.get_active_rules(&query()).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted() {
        let inner = Arc::new(CountingRepository::default());
        let cache = CachingRuleRepository::new(inner.clone(), Duration::from_millis(1));
        let first_day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        for offset in 0..500 {
            let day = first_day + chrono::Days::new(offset);
            cache
                .get_active_rules(&RuleQuery::new(RuleType::Deductible, day))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.get_active_rules(&query()).await.unwrap();

        assert_eq!(cache.cached_queries().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let inner = Arc::new(CountingRepository::default());
        let cache = CachingRuleRepository::new(inner.clone(), Duration::from_secs(60));

        cache.get_active_rules(&query()).await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.cached_queries().await, 0);
        cache.get_active_rules(&query()).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ttl_is_clamped() {
        let cache = CachingRuleRepository::new(
            Arc::new(CountingRepository::default()),
            Duration::from_secs(3600),
        );
        assert_eq!(cache.ttl(), MAX_RULE_CACHE_TTL);
    }
}
