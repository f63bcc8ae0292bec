//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `CATALOG_SOURCE` - URL or file path of the catalog JSON
//!   (default: `data/products-data.json`)
//! - `CATALOG_FALLBACK` - `sample` or `error` (default: `sample`)
//! - `CATALOG_CACHE_TTL_SECS` - How long a fetched catalog is reused (default: 300)
//! - `CATALOG_FETCH_TIMEOUT_SECS` - Timeout for URL sources (default: 10)
//! - `SITE_DATA_DIR` - Directory holding the shared site configuration (default: `data/site`)
//! - `STATIC_DIR` - Stylesheets, scripts and product images served under `/static`
//!   (default: `crates/storefront/static`)
//! - `SHIPPING_HOME_STATE` - Two-letter state that gets the local rate (default: ID)
//! - `SHIPPING_LOCAL_RATE` - Local flat rate in dollars (default: 8)
//! - `PAY_CASHTAG`, `PAY_VENMO`, `PAY_PAYPAL_ME`, `PAY_ZELLE_PHONE` - Payment handles
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use farmhouse_core::Price;
use farmhouse_core::order::PaymentHandles;
use farmhouse_core::shipping::ShippingRates;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::catalog::{CatalogSource, FallbackPolicy};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Where the menu comes from
    pub catalog: CatalogConfig,
    /// Directory of the file store shared with the admin server
    pub site_data_dir: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Base rate card; per-ZIP overrides come from the catalog
    pub shipping: ShippingRates,
    /// Payment app accounts shown at checkout
    pub payments: PaymentHandles,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
}

/// Catalog loading configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub source: CatalogSource,
    pub fallback: FallbackPolicy,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");

        let catalog = CatalogConfig::from_env()?;
        let site_data_dir = PathBuf::from(get_env_or_default("SITE_DATA_DIR", "data/site"));
        let static_dir =
            PathBuf::from(get_env_or_default("STATIC_DIR", "crates/storefront/static"));
        let shipping = shipping_from_env()?;
        let payments = payments_from_env();

        Ok(Self {
            host,
            port,
            base_url,
            catalog,
            site_data_dir,
            static_dir,
            shipping,
            payments,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            source: parse_env("CATALOG_SOURCE", "data/products-data.json")?,
            fallback: parse_env("CATALOG_FALLBACK", "sample")?,
            cache_ttl: Duration::from_secs(parse_env("CATALOG_CACHE_TTL_SECS", "300")?),
            fetch_timeout: Duration::from_secs(parse_env("CATALOG_FETCH_TIMEOUT_SECS", "10")?),
        })
    }
}

fn shipping_from_env() -> Result<ShippingRates, ConfigError> {
    let home_state = get_env_or_default("SHIPPING_HOME_STATE", "ID")
        .trim()
        .to_ascii_uppercase();
    if home_state.len() != 2 || !home_state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidEnvVar(
            "SHIPPING_HOME_STATE".to_string(),
            format!("expected a two-letter state code, got {home_state:?}"),
        ));
    }

    let local_rate: Decimal = parse_env("SHIPPING_LOCAL_RATE", "8")?;
    if local_rate.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "SHIPPING_LOCAL_RATE".to_string(),
            "must not be negative".to_string(),
        ));
    }

    Ok(ShippingRates {
        home_state,
        local_rate: Price::new(local_rate),
        ..ShippingRates::default()
    })
}

fn payments_from_env() -> PaymentHandles {
    let defaults = PaymentHandles::default();
    PaymentHandles {
        cashtag: get_optional_env("PAY_CASHTAG")
            .map_or(defaults.cashtag, |t| t.trim_start_matches('$').to_string()),
        venmo: get_optional_env("PAY_VENMO")
            .map_or(defaults.venmo, |v| v.trim_start_matches('@').to_string()),
        paypal_me: get_env_or_default("PAY_PAYPAL_ME", &defaults.paypal_me),
        zelle_phone: get_env_or_default("PAY_ZELLE_PHONE", &defaults.zelle_phone),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            catalog: CatalogConfig {
                source: "data/products-data.json".parse().unwrap(),
                fallback: FallbackPolicy::Sample,
                cache_ttl: Duration::from_secs(300),
                fetch_timeout: Duration::from_secs(10),
            },
            site_data_dir: PathBuf::from("data/site"),
            static_dir: PathBuf::from("crates/storefront/static"),
            shipping: ShippingRates::default(),
            payments: PaymentHandles::default(),
            sentry_dsn: None,
            sentry_environment: None,
            json_logs: false,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure_follows_base_url() {
        let mut config = test_config();
        assert!(!config.is_secure());
        config.base_url = "https://treats.example".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_parse_env_default_and_error() {
        let port: u16 = parse_env("YFHS_TEST_UNSET_PORT", "3000").unwrap();
        assert_eq!(port, 3000);

        let err = parse_env::<u16>("YFHS_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "YFHS_TEST_UNSET_PORT"));
    }

    #[test]
    fn test_unset_payment_handles_use_defaults() {
        let handles = payments_from_env();
        assert!(!handles.cashtag.starts_with('$'));
        assert!(!handles.venmo.starts_with('@'));
    }
}
