//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_DOMAIN` - Domain every store subdomain hangs off (e.g. `bazaar.shop`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 8000)
//! - `STOREFRONT_SECURE_COOKIES` - Mark session cookies `Secure` (default: false)
//! - `STOREFRONT_OTP_TTL_SECONDS` - One-time password lifetime (default: 600)
//! - `STOREFRONT_EXPOSE_OTP` - Echo issued OTPs in responses, development only (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_OTP_TTL_SECONDS: u64 = 10 * 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Normalized base domain used for tenant resolution
    pub base_domain: String,
    /// Whether session cookies require HTTPS
    pub secure_cookies: bool,
    /// One-time password settings
    pub otp: OtpConfig,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// One-time password settings.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// How long an issued code stays valid
    pub ttl: Duration,
    /// Return issued codes in the API response (no SMS gateway in development)
    pub expose_in_response: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_OTP_TTL_SECONDS),
            expose_in_response: false,
        }
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; Sentry stays disabled when absent
    pub dsn: Option<String>,
    /// Environment tag (e.g. `production`)
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Performance trace sample rate
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "8000")?;
        let base_domain = normalize_base_domain(&get_required_env("STOREFRONT_BASE_DOMAIN")?)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "STOREFRONT_BASE_DOMAIN".to_string(),
                    "must be a non-empty domain".to_string(),
                )
            })?;
        let secure_cookies = parse_env("STOREFRONT_SECURE_COOKIES", "false")?;

        let otp = OtpConfig {
            ttl: Duration::from_secs(parse_env(
                "STOREFRONT_OTP_TTL_SECONDS",
                &DEFAULT_OTP_TTL_SECONDS.to_string(),
            )?),
            expose_in_response: parse_env("STOREFRONT_EXPOSE_OTP", "false")?,
        };

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_domain,
            secure_cookies,
            otp,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Normalize a configured base domain: trim, lowercase, drop a leading dot,
/// a trailing dot, and any `:port`.
///
/// Returns `None` when nothing is left.
#[must_use]
pub fn normalize_base_domain(raw: &str) -> Option<String> {
    let lower = raw.trim().to_ascii_lowercase();
    let without_port = lower.split(':').next().unwrap_or_default();
    let domain = without_port.trim_start_matches('.').trim_end_matches('.');
    (!domain.is_empty()).then(|| domain.to_owned())
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_domain() {
        assert_eq!(
            normalize_base_domain(" .Bazaar.Shop:8000 ").as_deref(),
            Some("bazaar.shop")
        );
        assert_eq!(
            normalize_base_domain("example.com.").as_deref(),
            Some("example.com")
        );
        assert_eq!(normalize_base_domain("   "), None);
        assert_eq!(normalize_base_domain(":8000"), None);
    }

    #[test]
    fn test_parse_env_uses_default() {
        let port: u16 = parse_env("BAZAAR_TEST_UNSET_PORT_VARIABLE", "8000").unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn test_parse_env_rejects_invalid_default() {
        let result: Result<u16, _> = parse_env("BAZAAR_TEST_UNSET_PORT_VARIABLE", "eighty");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_otp_config_default() {
        let otp = OtpConfig::default();
        assert_eq!(otp.ttl, Duration::from_secs(600));
        assert!(!otp.expose_in_response);
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_domain: "example.com".to_string(),
            secure_cookies: false,
            otp: OtpConfig::default(),
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }
}
