//! Tariff domain errors
//!
//! Invalid inputs and payment-limit violations are not errors here: they come
//! back as an invalid `ShareResult`. A misconfigured rule is skipped and
//! reported in the evaluation. What remains is the one failure a caller has
//! to handle, the rule store being unreachable.

use thiserror::Error;

use core_kernel::PortError;

use crate::rules::RuleType;

#[derive(Debug, Error)]
pub enum TariffError {
    #[error("Rule store unavailable while loading {rule_type} rules: {source}")]
    RuleStoreUnavailable {
        rule_type: RuleType,
        #[source]
        source: PortError,
    },
}

impl TariffError {
    pub fn rule_store_unavailable(rule_type: RuleType, source: PortError) -> Self {
        TariffError::RuleStoreUnavailable { rule_type, source }
    }

    /// Returns true if retrying the calculation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TariffError::RuleStoreUnavailable { source, .. } => source.is_transient(),
        }
    }
}

pub type TariffResult<T> = Result<T, TariffError>;
