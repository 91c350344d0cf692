//! Infrastructure Database Layer
//!
//! PostgreSQL access for the tariff calculator using SQLx. The clinic
//! application owns the `business_rules` table; this crate only reads it.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: [`repositories`] holds the SQL
//! and the row types, [`adapters`] turns rows into domain rules and exposes
//! them through the domain's [`RuleRepository`](domain_tariff::RuleRepository)
//! port.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresRuleRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/clinic")).await?;
//! let rules = PostgresRuleRepository::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::{BusinessRuleRow, BusinessRuleRepository};
pub use adapters::PostgresRuleRepository;
