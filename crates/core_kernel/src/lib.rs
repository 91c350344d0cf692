//! Core Kernel - Foundational types for the clinic tariff system
//!
//! This crate provides the building blocks shared by the tariff domain and
//! its adapters:
//! - Money and Percentage types with precise decimal arithmetic
//! - The injectable rounding policy for currency amounts and percentages
//! - Validity windows and clinic-local dating
//! - Strongly-typed identifiers
//! - Port error and health types for the hexagonal boundary

pub mod money;
pub mod rounding;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Percentage};
pub use rounding::{RoundingPolicy, RoundingMode};
pub use temporal::{ValidityWindow, ClinicTimezone, TemporalError};
pub use identifiers::{
    RuleId, PatientId, ServiceId, ServiceCategoryId, InsurancePlanId,
    SupplementaryPlanId, CalculationId,
};
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
};
pub use error::CoreError;
