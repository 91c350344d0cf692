//! Test Utilities Crate
//!
//! Shared test infrastructure for the tariff workspace.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built amounts, dates, ids and rule payloads
//! - `builders`: Builders for calculation contexts and business rules
//! - `database`: PostgreSQL testcontainer management and rule seeding
//! - `assertions`: Reconciliation and money assertions
//! - `generators`: Property-based test data generators
//! - `doubles`: Rule stores that fail, stall or count calls

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;
pub mod doubles;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
pub use doubles::*;
