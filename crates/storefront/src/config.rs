//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `CMS_URL` - Base URL of the headless CMS (without `/api`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 4321)
//! - `CMS_API_TOKEN` - Bearer token sent to the CMS (high entropy, no placeholders)
//! - `CMS_CACHE_TTL_SECS` - Lifetime of cached CMS reads (default: 300)
//! - `SUGGESTIONS_LIMIT` - Maximum search suggestions per request (default: 8)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Headless CMS connection
    pub cms: CmsConfig,
    /// Maximum number of search suggestions returned per query
    pub suggestions_limit: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Headless CMS configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct CmsConfig {
    /// CMS base URL; the REST API lives under `/api`
    pub url: Url,
    /// Bearer token for the CMS API
    pub api_token: Option<SecretString>,
    /// Lifetime of cached read responses
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for CmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsConfig")
            .field("url", &self.url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl CmsConfig {
    /// Configuration for a CMS without a token and with the default cache TTL.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self {
            url,
            api_token: None,
            cache_ttl: Duration::from_secs(300),
        }
    }

    /// Load only the CMS settings (`CMS_URL`, `CMS_API_TOKEN`,
    /// `CMS_CACHE_TTL_SECS`) from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `CMS_URL` is missing or invalid, or the token
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_source(&|key: &str| std::env::var(key).ok())
    }

    /// Load the CMS settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_source(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source = Source(env);
        Ok(Self {
            url: source.url("CMS_URL")?,
            api_token: source.secret("CMS_API_TOKEN")?,
            cache_ttl: Duration::from_secs(source.parsed::<u64>("CMS_CACHE_TTL_SECS", "300")?),
        })
    }

    /// The API token, if configured.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|token| token.expose_secret())
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the CMS token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_source(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source = Source(env);

        let host = source.parsed::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = source.parsed::<u16>("STOREFRONT_PORT", "4321")?;
        let base_url = source.url("STOREFRONT_BASE_URL")?;

        let cms = CmsConfig::from_source(env)?;

        let suggestions_limit = source.parsed::<u32>("SUGGESTIONS_LIMIT", "8")?;
        let sentry_sample_rate = source.rate("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = source.rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            host,
            port,
            base_url,
            cms,
            suggestions_limit,
            sentry_dsn: source.optional("SENTRY_DSN"),
            sentry_environment: source.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Source<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Source<'_, F> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        Url::parse(&self.required(key)?)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Load an optional secret, rejecting placeholders and low-entropy values.
    fn secret(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(None);
        };
        validate_secret_strength(&value, key)?;
        Ok(Some(SecretString::from(value)))
    }

    fn rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate = self.parsed::<f32>(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be between 0.0 and 1.0 (got {rate})"),
            ))
        }
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}
