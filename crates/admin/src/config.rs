//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_PASSWORD` - Editor password (min 8 chars, placeholders rejected)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel (default: <http://localhost:3001>)
//! - `ADMIN_CATALOG_PATH` - Catalog JSON the editor starts from
//!   (default: `data/products-data.json`)
//! - `SITE_DATA_DIR` - Directory holding the shared site configuration (default: `data/site`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Editor password. A deterrent, not a trust boundary.
    pub password: SecretString,
    /// Catalog file the editor loads; never written by the server
    pub catalog_path: PathBuf,
    /// Directory of the file store shared with the storefront
    pub site_data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("password", &"[REDACTED]")
            .field("catalog_path", &self.catalog_path)
            .field("site_data_dir", &self.site_data_dir)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[SET]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `ADMIN_PASSWORD` is missing or fails
    /// validation, or if an optional variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;

        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let base_url = get_env_or_default("ADMIN_BASE_URL", "http://localhost:3001");
        let password = get_validated_password("ADMIN_PASSWORD")?;

        Ok(Self {
            host,
            port,
            base_url,
            password,
            catalog_path: PathBuf::from(get_env_or_default(
                "ADMIN_CATALOG_PATH",
                "data/products-data.json",
            )),
            site_data_dir: PathBuf::from(get_env_or_default("SITE_DATA_DIR", "data/site")),
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

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a password is long enough and not a placeholder.
fn validate_password(password: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = password.expose_secret();
    let len = value.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_PASSWORD_LENGTH} characters (got {len})"),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate the password from environment.
fn get_validated_password(key: &str) -> Result<SecretString, ConfigError> {
    let password = SecretString::from(get_required_env(key)?);
    validate_password(&password, key)?;
    Ok(password)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> AdminConfig {
        AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            password: SecretString::from("farmhouse-2024"),
            catalog_path: PathBuf::from("data/products-data.json"),
            site_data_dir: PathBuf::from("data/site"),
            sentry_dsn: None,
            sentry_environment: None,
            json_logs: false,
        }
    }

    #[test]
    fn test_validate_password_too_short() {
        let result = validate_password(&SecretString::from("pie"), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_password_placeholder() {
        let result = validate_password(&SecretString::from("ChangeMe123"), "TEST_VAR");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("placeholder"));

        let result = validate_password(&SecretString::from("my-password-1"), "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_password_valid() {
        let result = validate_password(&SecretString::from("snickerdoodle42"), "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_required_env_missing() {
        let err = get_required_env("YFHS_TEST_UNSET_PASSWORD").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "YFHS_TEST_UNSET_PASSWORD"));
    }

    #[test]
    fn test_admin_config_debug_redacts_password() {
        let debug_output = format!("{:?}", test_config());

        assert!(debug_output.contains("3001"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("farmhouse-2024"));
    }
}
