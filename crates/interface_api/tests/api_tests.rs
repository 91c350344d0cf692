//! HTTP round-trip tests for the calculation service

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use core_kernel::Currency;
use domain_tariff::rules::{BusinessRule, InMemoryRuleRepository, RuleRepository, RuleType};
use domain_tariff::{FailureKind, Locale};
use interface_api::config::ApiConfig;
use interface_api::dto::calculation::ShareResultResponse;
use interface_api::error::ErrorResponse;
use interface_api::handlers::health::HealthResponse;
use interface_api::{create_router, AppState};

use test_utils::{
    BusinessRuleBuilder, FailingRuleRepository, IdFixtures, SlowRuleRepository,
    UnfilteredRuleRepository,
};

const CALCULATE: &str = "/api/v1/calculate-share";

fn server_with(rules: Arc<dyn RuleRepository>, config: ApiConfig) -> TestServer {
    TestServer::new(create_router(AppState::new(rules, config))).unwrap()
}

fn server(rules: Vec<BusinessRule>) -> TestServer {
    server_with(
        Arc::new(InMemoryRuleRepository::new(rules)),
        ApiConfig::default(),
    )
}

/// A 1,000,000 IRR visit under an active 80% plan
fn request(amount: i64) -> Value {
    json!({
        "patient": {"id": IdFixtures::patient_id(), "age": 40, "gender": "male"},
        "service": {
            "id": IdFixtures::service_id(),
            "category_id": IdFixtures::category_id(),
            "amount": amount
        },
        "insurance_plan": {
            "id": IdFixtures::plan_id(),
            "coverage_percent": 80
        },
        "calculation_date": "2024-06-15"
    })
}

fn english() -> HeaderValue {
    HeaderValue::from_static("en-US,en;q=0.9")
}

// ============================================================================
// Calculation Tests
// ============================================================================

mod calculate_share {
    use super::*;

    #[tokio::test]
    async fn test_automatic_split_in_minor_units() {
        let mut body = request(1_000_000);
        body["insurance_plan"]["deductible"] = json!(100_000);
        body["insurance_plan"]["supplementary"] = json!({
            "id": IdFixtures::supplementary_plan_id(),
            "coverage_percent": "50"
        });

        let response = server(vec![]).post(CALCULATE).json(&body).await;

        response.assert_status_ok();
        let result: ShareResultResponse = response.json();
        assert!(result.is_valid);
        assert_eq!(result.tariff_price, 1_000_000);
        assert_eq!(result.insurer_share, 860_000);
        assert_eq!(result.patient_share, 140_000);
        assert_eq!(result.supplementary_amount, 140_000);
        assert_eq!(result.insurer_share_percent, "86.00");
        assert_eq!(result.patient_share_percent, "14.00");
        assert_eq!(result.supplementary_percent_of_total.as_deref(), Some("14.00"));
        assert_eq!(result.currency.code(), "IRR");
    }

    #[tokio::test]
    async fn test_manual_split() {
        let mut body = request(1_000_000);
        body["manual_shares"] = json!({"patient_percent": 70, "insurer_percent": 30});

        let response = server(vec![]).post(CALCULATE).json(&body).await;

        response.assert_status_ok();
        let result: ShareResultResponse = response.json();
        assert_eq!(result.patient_share, 700_000);
        assert_eq!(result.insurer_share, 300_000);
    }

    #[tokio::test]
    async fn test_discount_rule_is_reported() {
        let rule = BusinessRuleBuilder::discount(RuleType::ServiceBasedDiscount, 10)
            .named("Clinic promotion")
            .build();

        let response = server(vec![rule]).post(CALCULATE).json(&request(1_000_000)).await;

        response.assert_status_ok();
        let result: ShareResultResponse = response.json();
        assert_eq!(result.original_price, 1_000_000);
        assert_eq!(result.discount_amount, 100_000);
        assert_eq!(result.tariff_price, 900_000);
        assert_eq!(result.insurer_share, 720_000);
        assert_eq!(result.patient_share, 180_000);
        assert_eq!(result.applied_rules.len(), 1);
        assert_eq!(result.applied_rules[0].name, "Clinic promotion");
    }

    #[tokio::test]
    async fn test_malformed_rule_is_skipped_not_fatal() {
        let rule = BusinessRuleBuilder::new(RuleType::CoveragePercent)
            .named("Broken coverage")
            .with_actions(test_utils::RuleJsonFixtures::malformed())
            .build();

        let response = server(vec![rule]).post(CALCULATE).json(&request(1_000_000)).await;

        response.assert_status_ok();
        let result: ShareResultResponse = response.json();
        assert_eq!(result.insurer_share, 800_000);
        assert_eq!(result.skipped_rules.len(), 1);
        assert_eq!(result.skipped_rules[0].name, "Broken coverage");
    }
}

// ============================================================================
// Invalid Result Tests
// ============================================================================

mod invalid_results {
    use super::*;

    #[tokio::test]
    async fn test_percentages_over_hundred_answer_422_with_body() {
        let mut body = request(1_000_000);
        body["manual_shares"] = json!({"patient_percent": 60, "insurer_percent": 50});

        let response = server(vec![])
            .post(CALCULATE)
            .add_header(header::ACCEPT_LANGUAGE, english())
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let result: ShareResultResponse = response.json();
        assert!(!result.is_valid);
        assert_eq!(result.failure_kind, Some(FailureKind::InvalidPercentage));
        assert_eq!(result.patient_share, 0);
        assert_eq!(result.insurer_share, 0);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Patient share (60) and insurer share (50) percentages add up to more than 100")
        );
    }

    #[tokio::test]
    async fn test_messages_default_to_persian() {
        let mut body = request(1_000_000);
        body["manual_shares"] = json!({"patient_percent": 60, "insurer_percent": 50});
        let app = server(vec![]);

        let persian: ShareResultResponse = app.post(CALCULATE).json(&body).await.json();
        let in_english: ShareResultResponse = app
            .post(CALCULATE)
            .add_header(header::ACCEPT_LANGUAGE, english())
            .json(&body)
            .await
            .json();

        let persian = persian.error_message.unwrap_or_default();
        assert!(!persian.is_empty());
        assert_ne!(Some(persian), in_english.error_message);
    }

    #[tokio::test]
    async fn test_configured_locale_applies_without_header() {
        let config = ApiConfig {
            locale: Locale::English,
            ..ApiConfig::default()
        };
        let app = server_with(Arc::new(InMemoryRuleRepository::default()), config);

        let result: ShareResultResponse = app.post(CALCULATE).json(&request(0)).await.json();

        assert_eq!(result.failure_kind, Some(FailureKind::InvalidTariffPrice));
        assert!(result.error_message.unwrap_or_default().is_ascii());
    }

    #[tokio::test]
    async fn test_payment_limit_exceeded() {
        let mut body = request(15_000_000);
        body["insurance_plan"]["coverage_percent"] = json!(100);
        let rule = BusinessRuleBuilder::insurer_ceiling(10_000_000).build();

        let response = server(vec![rule])
            .post(CALCULATE)
            .add_header(header::ACCEPT_LANGUAGE, english())
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let result: ShareResultResponse = response.json();
        assert_eq!(result.failure_kind, Some(FailureKind::PaymentLimitExceeded));
        assert_eq!(
            result.error_message.as_deref(),
            Some("Insurer share (15000000 IRR) exceeds the payment limit (10000000 IRR)")
        );
    }
}

// ============================================================================
// Request Validation Tests
// ============================================================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_coverage_out_of_range_is_rejected() {
        let mut body = request(1_000_000);
        body["insurance_plan"]["coverage_percent"] = json!(120);

        let response = server(vec![]).post(CALCULATE).json(&body).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let error: ErrorResponse = response.json();
        assert_eq!(error.error, "validation_error");
        let details = error.details.unwrap_or_default();
        assert_eq!(details.len(), 1);
        assert!(details[0].starts_with("insurance_plan.coverage_percent"));
    }

    #[tokio::test]
    async fn test_currency_other_than_configured_is_rejected() {
        let mut body = request(12_345);
        body["service"]["currency"] = json!("USD");

        let response = server(vec![]).post(CALCULATE).json(&body).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let error: ErrorResponse = response.json();
        assert_eq!(error.error, "bad_request");
    }

    #[tokio::test]
    async fn test_configured_currency_rounds_in_cents() {
        let config = ApiConfig {
            currency: Currency::USD,
            ..ApiConfig::default()
        };
        let app = server_with(Arc::new(InMemoryRuleRepository::default()), config);
        let mut body = request(12_345);
        body["service"]["currency"] = json!("USD");

        let response = app.post(CALCULATE).json(&body).await;

        response.assert_status_ok();
        let result: ShareResultResponse = response.json();
        assert_eq!(result.currency, Currency::USD);
        assert_eq!(result.tariff_price, 12_345);
        assert_eq!(result.insurer_share, 9_876);
        assert_eq!(result.patient_share, 2_469);
    }

    #[tokio::test]
    async fn test_missing_fields_are_client_errors() {
        let response = server(vec![])
            .post(CALCULATE)
            .json(&json!({"patient": {"age": 40}}))
            .await;

        assert!(response.status_code().is_client_error());
    }
}

// ============================================================================
// Rule Store Tests
// ============================================================================

mod rule_store {
    use super::*;

    #[tokio::test]
    async fn test_store_failure_answers_503() {
        let app = server_with(Arc::new(FailingRuleRepository), ApiConfig::default());

        let response = app.post(CALCULATE).json(&request(1_000_000)).await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let error: ErrorResponse = response.json();
        assert_eq!(error.error, "service_unavailable");
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let config = ApiConfig {
            rule_fetch_timeout_ms: 20,
            ..ApiConfig::default()
        };
        let store = SlowRuleRepository::new(Duration::from_millis(500), vec![]);
        let app = server_with(Arc::new(store), config);

        let response = app.post(CALCULATE).json(&request(1_000_000)).await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_configured_cache_serves_repeat_requests() {
        let store = Arc::new(UnfilteredRuleRepository::new(vec![]));
        let config = ApiConfig {
            rule_cache_ttl_secs: 60,
            ..ApiConfig::default()
        };
        let app = server_with(store.clone(), config);

        app.post(CALCULATE).json(&request(1_000_000)).await.assert_status_ok();
        app.post(CALCULATE).json(&request(1_000_000)).await.assert_status_ok();

        assert_eq!(store.calls(), RuleType::ALL.len());
    }
}

// ============================================================================
// Health Tests
// ============================================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let response = server(vec![]).get("/health").await;

        response.assert_status_ok();
        let health: HealthResponse = response.json();
        assert_eq!(health.status, "healthy");
        assert!(health.rule_store.is_none());
    }

    #[tokio::test]
    async fn test_readiness_reports_rule_store() {
        let response = server(vec![]).get("/health/ready").await;

        response.assert_status_ok();
        let health: HealthResponse = response.json();
        assert_eq!(health.status, "ready");
        assert!(health.rule_store.is_some_and(|check| check.is_healthy()));
    }

    #[tokio::test]
    async fn test_readiness_fails_with_store_down() {
        let app = server_with(Arc::new(FailingRuleRepository), ApiConfig::default());

        let response = app.get("/health/ready").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let health: HealthResponse = response.json();
        assert_eq!(health.status, "unavailable");
    }

    #[tokio::test]
    async fn test_request_id_is_returned() {
        let response = server(vec![]).get("/health").await;

        assert!(response.headers().contains_key("x-request-id"));
    }
}
