//! Integration tests for the PostgreSQL rule store
//!
//! These start a PostgreSQL container and need Docker; run them with
//! `cargo test -p infra_db -- --ignored`.

use core_kernel::HealthCheckable;
use domain_tariff::rules::{RuleQuery, RuleRepository, RuleType};
use infra_db::PostgresRuleRepository;

use test_utils::{create_isolated_test_database, BusinessRuleBuilder, DateFixtures, IdFixtures};

// ============================================================================
// Query Filtering Tests
// ============================================================================

mod query_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_fetch_applies_type_scope_and_validity() {
        let db = create_isolated_test_database().await.unwrap();

        let rules = [
            BusinessRuleBuilder::coverage(90)
                .with_id(IdFixtures::rule_id(1))
                .for_plan(IdFixtures::plan_id())
                .build(),
            BusinessRuleBuilder::coverage(60)
                .with_id(IdFixtures::rule_id(2))
                .for_plan(IdFixtures::other_plan_id())
                .build(),
            BusinessRuleBuilder::coverage(50)
                .with_id(IdFixtures::rule_id(3))
                .inactive()
                .build(),
            BusinessRuleBuilder::coverage(40)
                .with_id(IdFixtures::rule_id(4))
                .valid_between(DateFixtures::year_start(), DateFixtures::year_end())
                .build(),
            BusinessRuleBuilder::deductible(100_000)
                .with_id(IdFixtures::rule_id(5))
                .build(),
        ];
        for rule in &rules {
            db.insert_rule(rule).await.unwrap();
        }

        let adapter = PostgresRuleRepository::new(db.pool().clone());
        let query = RuleQuery::new(RuleType::CoveragePercent, DateFixtures::calculation_day())
            .for_plan(IdFixtures::plan_id())
            .for_category(IdFixtures::category_id());

        let found = adapter.get_active_rules(&query).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![IdFixtures::rule_id(1), IdFixtures::rule_id(4)]);

        let later = RuleQuery::new(RuleType::CoveragePercent, DateFixtures::after_year_end())
            .for_plan(IdFixtures::plan_id());
        let found = adapter.get_active_rules(&later).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, IdFixtures::rule_id(1));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_unknown_rule_type_rows_are_skipped() {
        let db = create_isolated_test_database().await.unwrap();

        db.insert_rule(&BusinessRuleBuilder::coverage(90).build())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO business_rules (rule_id, name, rule_type, priority, actions) \
             VALUES ($1, 'legacy', 'CoveragePercent', 5, '[{\"type\": \"coverage_percent\", \"value\": 75}]')",
        )
        .bind(uuid::Uuid::from_u128(0xBEEF))
        .execute(db.pool())
        .await
        .unwrap();

        let adapter = PostgresRuleRepository::new(db.pool().clone());
        let query = RuleQuery::new(RuleType::CoveragePercent, DateFixtures::calculation_day());
        let found = adapter.get_active_rules(&query).await.unwrap();

        // the PascalCase row is read as a coverage rule too
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].priority, 5);
    }
}

// ============================================================================
// Health Check Tests
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_health_check_reports_healthy() {
        let db = create_isolated_test_database().await.unwrap();
        let adapter = PostgresRuleRepository::new(db.pool().clone());

        let health = adapter.health_check().await;
        assert!(health.is_healthy());
        assert_eq!(health.adapter_id, "postgres-rule-adapter");
        assert_eq!(adapter.repository().count_active().await.unwrap(), 0);
    }
}
