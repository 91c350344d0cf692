//! Business rule repository
//!
//! Read access to the `business_rules` table. Filtering on type, activity,
//! scope and validity happens in SQL; turning rows into domain rules is left
//! to the adapter.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::DatabaseError;

const SELECT_COLUMNS: &str = r#"
    SELECT
        rule_id,
        name,
        rule_type,
        priority,
        conditions,
        actions,
        is_active,
        insurance_plan_id,
        service_category_id,
        service_id,
        valid_from,
        valid_to
    FROM business_rules
"#;

/// One row of `business_rules`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BusinessRuleRow {
    pub rule_id: Uuid,
    pub name: String,
    pub rule_type: String,
    pub priority: i16,
    pub conditions: String,
    pub actions: String,
    pub is_active: bool,
    pub insurance_plan_id: Option<Uuid>,
    pub service_category_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// Repository for the business rule table
#[derive(Debug, Clone)]
pub struct BusinessRuleRepository {
    pool: PgPool,
}

impl BusinessRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetches the active rules of one type for a plan and category on a day
    ///
    /// Type names are compared without case or underscores, so rows written
    /// as `CoveragePercent` and `coverage_percent` both match. A `None` plan
    /// or category only matches rows that leave that scope unset.
    #[instrument(skip(self))]
    pub async fn find_active(
        &self,
        rule_type: &str,
        insurance_plan_id: Option<Uuid>,
        service_category_id: Option<Uuid>,
        as_of: NaiveDate,
    ) -> Result<Vec<BusinessRuleRow>, DatabaseError> {
        let sql = format!(
            r#"{SELECT_COLUMNS}
            WHERE replace(lower(rule_type), '_', '') = $1
              AND is_active
              AND (insurance_plan_id IS NULL OR insurance_plan_id = $2)
              AND (service_category_id IS NULL OR service_category_id = $3)
              AND (valid_from IS NULL OR valid_from <= $4)
              AND (valid_to IS NULL OR valid_to >= $4)
            ORDER BY priority ASC, rule_id ASC
            "#
        );

        let rows = sqlx::query_as::<_, BusinessRuleRow>(&sql)
            .bind(normalize_type(rule_type))
            .bind(insurance_plan_id)
            .bind(service_category_id)
            .bind(as_of)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(&e))?;

        debug!(count = rows.len(), "Fetched business rules");
        Ok(rows)
    }

    /// Counts active rules, used for readiness reporting
    pub async fn count_active(&self) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM business_rules WHERE is_active")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(&e))
    }
}

fn normalize_type(rule_type: &str) -> String {
    rule_type.to_ascii_lowercase().replace('_', "")
}
