//! API configuration

use std::str::FromStr;

use config::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;

use core_kernel::{Currency, Rate};
use domain_billing::BillingPolicy;
use infra_db::DatabaseConfig;

/// API configuration
///
/// Every field can be set through an `API_`-prefixed environment variable,
/// e.g. `API_JWT_SECRET` or `API_REQUIRE_VISIT=true`. Unset fields keep
/// their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// ISO code of the currency invoices are issued in
    pub currency: String,
    /// Reject invoices without a visit reference
    pub require_visit: bool,
    /// Senior citizen / PWD discount in percent
    pub concession_percentage: Decimal,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/clinic".to_string(),
            db_max_connections: 10,
            db_min_connections: 2,
            log_level: "info".to_string(),
            log_json: false,
            currency: "PHP".to_string(),
            require_visit: false,
            concession_percentage: Decimal::from(20),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the ledger policy from the billing settings
    pub fn billing_policy(&self) -> Result<BillingPolicy, ConfigError> {
        let currency = Currency::from_str(&self.currency)
            .map_err(|e| ConfigError::Message(format!("currency: {}", e)))?;
        if self.concession_percentage < Decimal::ZERO || self.concession_percentage > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Message(format!(
                "concession_percentage must be within 0..=100, got {}",
                self.concession_percentage
            )));
        }

        Ok(BillingPolicy::default()
            .with_currency(currency)
            .with_concession_rate(Rate::from_percentage(self.concession_percentage))
            .requiring_visit(self.require_visit))
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.db_max_connections)
            .min_connections(self.db_min_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_clinic_defaults() {
        let policy = ApiConfig::default().billing_policy().unwrap();
        assert_eq!(policy, BillingPolicy::default());
    }

    #[test]
    fn test_policy_rejects_unknown_currency() {
        let config = ApiConfig {
            currency: "ZZZ".to_string(),
            ..Default::default()
        };
        assert!(config.billing_policy().is_err());
    }

    #[test]
    fn test_policy_rejects_out_of_range_concession() {
        let config = ApiConfig {
            concession_percentage: Decimal::from(120),
            ..Default::default()
        };
        assert!(config.billing_policy().is_err());
    }

    #[test]
    fn test_database_config_carries_pool_sizing() {
        let config = ApiConfig {
            db_max_connections: 25,
            ..Default::default()
        };
        let db = config.database_config();
        assert_eq!(db.max_connections, 25);
        assert_eq!(db.url, "postgres://localhost/clinic");
    }
}
