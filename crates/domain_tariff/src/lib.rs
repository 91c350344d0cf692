//! Clinic Tariff Domain
//!
//! Computes, for one billable service line, how much of the price the
//! patient pays and how much the insurer reimburses, and lets clinics adjust
//! that split through business rules held as data.
//!
//! # Components
//!
//! - [`ShareCalculator`]: exact patient/insurer split under a rounding policy
//! - [`rules::BusinessRuleEngine`]: evaluates stored rules into effective parameters
//! - [`InsuranceTariffOrchestrator`]: composes both and checks payment limits
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_tariff::{InsuranceTariffOrchestrator, ShareCalculator};
//! use domain_tariff::rules::InMemoryRuleRepository;
//!
//! let rules = Arc::new(InMemoryRuleRepository::from_path("rules.json").await?);
//! let orchestrator = InsuranceTariffOrchestrator::with_repository(rules, ShareCalculator::default());
//!
//! let result = orchestrator.calculate(&context).await?;
//! if result.is_valid {
//!     println!("patient pays {}", result.patient_share);
//! }
//! ```

pub mod context;
pub mod share;
pub mod result;
pub mod rules;
pub mod orchestrator;
pub mod messages;
pub mod error;

pub use context::{
    CalculationContext, Gender, InsurancePlanInfo, ManualShares, PatientInfo, ServiceInfo,
    SupplementaryPlanInfo,
};
pub use share::{
    AutomaticShareRequest, ManualShareRequest, ShareBreakdown, ShareCalculator, ShareError,
    ShareMode, ShareRequest,
};
pub use result::{FailureKind, ShareResult};
pub use orchestrator::InsuranceTariffOrchestrator;
pub use messages::Locale;
pub use error::{TariffError, TariffResult};
