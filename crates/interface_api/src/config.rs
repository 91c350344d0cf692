//! API configuration
//!
//! Read from `API_*` environment variables, e.g. `API_PORT=8080`,
//! `API_LOCALE=en-US`, `API_RULE_CACHE_TTL_SECS=60`.

use serde::Deserialize;
use std::time::Duration;

use core_kernel::{ClinicTimezone, Currency, RoundingMode, RoundingPolicy};
use domain_tariff::Locale;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// PostgreSQL rule store; takes precedence over `rules_file`
    #[serde(default)]
    pub database_url: Option<String>,
    /// Apply the bundled migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
    /// JSON rule document used when no database is configured
    #[serde(default)]
    pub rules_file: Option<String>,
    /// Language of result messages when the client states no preference
    pub locale: Locale,
    /// Currency assumed for requests that do not name one
    pub currency: Currency,
    /// Currency decimal places; defaults to the currency's own precision
    #[serde(default)]
    pub rounding_decimals: Option<u32>,
    pub rounding_mode: RoundingMode,
    /// Rule cache lifetime in seconds, 0 disables caching
    pub rule_cache_ttl_secs: u64,
    /// Rule fetch timeout in milliseconds, 0 waits indefinitely
    pub rule_fetch_timeout_ms: u64,
    /// Timezone used to date requests that carry no calculation date
    pub timezone: ClinicTimezone,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            database_url: None,
            run_migrations: false,
            rules_file: None,
            locale: Locale::default(),
            currency: Currency::default(),
            rounding_decimals: None,
            rounding_mode: RoundingMode::HalfAwayFromZero,
            rule_cache_ttl_secs: 0,
            rule_fetch_timeout_ms: 2_000,
            timezone: ClinicTimezone::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("log_level", "info")?
            .set_default("locale", Locale::default().tag())?
            .set_default("currency", Currency::default().code())?
            .set_default("rounding_mode", "half_away_from_zero")?
            .set_default("rule_cache_ttl_secs", 0)?
            .set_default("rule_fetch_timeout_ms", 2_000)?
            .set_default("timezone", ClinicTimezone::default().name())?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every calculation fail
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if let Some(decimals) = self.rounding_decimals {
            if decimals > self.currency.decimal_places() {
                return Err(config::ConfigError::Message(format!(
                    "rounding_decimals {} exceeds the {} decimal places of {}",
                    decimals,
                    self.currency.decimal_places(),
                    self.currency
                )));
            }
        }
        Ok(())
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rounding_policy(&self) -> RoundingPolicy {
        let base = RoundingPolicy::for_currency(self.currency);
        RoundingPolicy::new(
            self.rounding_decimals.unwrap_or(base.currency_decimal_places),
            base.percentage_decimal_places,
            self.rounding_mode,
        )
    }

    pub fn rule_cache_ttl(&self) -> Option<Duration> {
        (self.rule_cache_ttl_secs > 0).then(|| Duration::from_secs(self.rule_cache_ttl_secs))
    }

    pub fn rule_fetch_timeout(&self) -> Option<Duration> {
        (self.rule_fetch_timeout_ms > 0).then(|| Duration::from_millis(self.rule_fetch_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_follows_currency() {
        let config = ApiConfig::default();
        let policy = config.rounding_policy();
        assert_eq!(policy.currency_decimal_places, 0);
        assert_eq!(policy.percentage_decimal_places, 2);

        let usd = ApiConfig {
            currency: Currency::USD,
            ..ApiConfig::default()
        };
        assert_eq!(usd.rounding_policy().currency_decimal_places, 2);
    }

    #[test]
    fn test_rounding_decimals_cannot_exceed_currency() {
        let config = ApiConfig {
            rounding_decimals: Some(2),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());

        let coarser = ApiConfig {
            currency: Currency::USD,
            rounding_decimals: Some(0),
            ..ApiConfig::default()
        };
        assert!(coarser.validate().is_ok());
        assert_eq!(coarser.rounding_policy().currency_decimal_places, 0);
    }

    #[test]
    fn test_zero_disables_cache_and_timeout() {
        let config = ApiConfig {
            rule_cache_ttl_secs: 0,
            rule_fetch_timeout_ms: 0,
            ..ApiConfig::default()
        };
        assert!(config.rule_cache_ttl().is_none());
        assert!(config.rule_fetch_timeout().is_none());
        assert_eq!(
            ApiConfig::default().rule_fetch_timeout(),
            Some(Duration::from_millis(2_000))
        );
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(ApiConfig::default().server_addr(), "0.0.0.0:8080");
    }
}
