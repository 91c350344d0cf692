//! Domain Adapters
//!
//! Implementations of domain ports on top of the repository layer.

pub mod rules;

pub use rules::PostgresRuleRepository;
