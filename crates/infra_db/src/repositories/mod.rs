//! Repository implementations
//!
//! Repositories encapsulate the SQL and map result sets onto row types.
//! Queries are built at runtime with `sqlx::query_as`, so the crate builds
//! without a reachable database.

pub mod rules;

pub use rules::{BusinessRuleRow, BusinessRuleRepository};
