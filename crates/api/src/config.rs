//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONTACTS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `API_ALLOWED_ORIGINS` - Comma-separated CORS origins
//!   (default: `http://localhost:3000,http://localhost:8080`)
//! - `API_ALLOWED_ORIGIN_SUFFIXES` - Comma-separated host suffixes accepted for
//!   CORS, e.g. `.netlify.app` for deploy previews (default: none)
//! - `API_TOKEN_TTL_HOURS` - Bearer token lifetime in hours (default: 24)
//! - `API_INDEX_SYNC_POLICY` - `warn` or `strict` (default: warn)
//! - `API_DB_CONNECT_TIMEOUT_SECS` - Database connect timeout (default: 7)
//! - `API_RATE_LIMIT` - Rate limit `/api/users/*` per client IP (default: true)
//! - `API_CLIENT_IP_HEADER` - Header set by a trusted reverse proxy carrying the
//!   client IP, e.g. `cf-connecting-ip` or `x-forwarded-for` (default: none, the
//!   socket peer address is used)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::HeaderName;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::db::indexes::IndexSyncPolicy;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:8080";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed to call the API from a browser
    pub cors: AllowedOrigins,
    /// Lifetime of issued bearer tokens
    pub token_ttl: Duration,
    /// What to do when existing data prevents a declared index from being built
    pub index_sync_policy: IndexSyncPolicy,
    /// How long to wait for the database before giving up at startup
    pub db_connect_timeout: Duration,
    /// Whether authentication endpoints are rate limited
    pub rate_limit: bool,
    /// Proxy header trusted to carry the client IP for rate limiting
    pub client_ip_header: Option<HeaderName>,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Browser origins allowed by the CORS layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedOrigins {
    /// Exact origins (scheme, host and port), without trailing slash.
    pub exact: Vec<String>,
    /// Host suffixes; any `http(s)` origin whose host ends with one is allowed.
    pub host_suffixes: Vec<String>,
}

impl AllowedOrigins {
    /// Returns true if the given `Origin` header value is allowed.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        if self.exact.iter().any(|o| o == origin) {
            return true;
        }

        if self.host_suffixes.is_empty() {
            return false;
        }

        let Ok(url) = Url::parse(origin) else {
            return false;
        };

        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        url.host_str().is_some_and(|host| {
            self.host_suffixes
                .iter()
                .any(|suffix| host.ends_with(suffix.as_str()))
        })
    }
}

impl ApiConfig {
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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env.database_url("CONTACTS_DATABASE_URL")?;
        let host = env.parsed_or("API_HOST", "0.0.0.0", str::parse::<IpAddr>)?;
        let port = env.parsed_or("PORT", "5000", str::parse::<u16>)?;

        let cors = AllowedOrigins {
            exact: split_list(&env.or_default("API_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS))
                .into_iter()
                .map(|o| o.trim_end_matches('/').to_owned())
                .collect(),
            host_suffixes: split_list(&env.or_default("API_ALLOWED_ORIGIN_SUFFIXES", "")),
        };

        let ttl_hours = env.parsed_or("API_TOKEN_TTL_HOURS", "24", str::parse::<u64>)?;
        if ttl_hours == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "API_TOKEN_TTL_HOURS".to_owned(),
                "must be at least 1".to_owned(),
            ));
        }

        let index_sync_policy =
            env.parsed_or("API_INDEX_SYNC_POLICY", "warn", str::parse::<IndexSyncPolicy>)?;
        let connect_secs = env.parsed_or("API_DB_CONNECT_TIMEOUT_SECS", "7", str::parse::<u64>)?;
        let rate_limit = env.parsed_or("API_RATE_LIMIT", "true", str::parse::<bool>)?;
        let client_ip_header = env
            .get("API_CLIENT_IP_HEADER")
            .map(|v| HeaderName::from_bytes(v.trim().to_ascii_lowercase().as_bytes()))
            .transpose()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("API_CLIENT_IP_HEADER".to_owned(), e.to_string())
            })?;

        let log_format = match env.get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            database_url,
            host,
            port,
            cors,
            token_ttl: Duration::from_secs(ttl_hours * 60 * 60),
            index_sync_policy,
            db_connect_timeout: Duration::from_secs(connect_secs),
            rate_limit,
            client_ip_header,
            log_format,
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
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

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating empty values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    /// Get a variable (or its default) and parse it.
    fn parsed_or<T, E, P>(&self, key: &str, default: &str, parse: P) -> Result<T, ConfigError>
    where
        E: std::fmt::Display,
        P: Fn(&str) -> Result<T, E>,
    {
        let raw = self.or_default(key, default);
        parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.get(primary_key)
            .or_else(|| self.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_owned()))
    }
}

/// Split a comma-separated list, dropping empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/contacts")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(config.token_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.index_sync_policy, IndexSyncPolicy::Warn);
        assert_eq!(config.db_connect_timeout, Duration::from_secs(7));
        assert!(config.rate_limit);
        assert_eq!(config.client_ip_header, None);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(
            config.cors.exact,
            vec!["http://localhost:3000", "http://localhost:8080"]
        );
        assert!(config.cors.host_suffixes.is_empty());
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[("PORT", "8000")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CONTACTS_DATABASE_URL"));
    }

    #[test]
    fn test_primary_database_url_wins() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("CONTACTS_DATABASE_URL", "postgres://primary/db"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://primary/db");
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("DATABASE_URL", "postgres://x/y"), ("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "PORT"));
    }

    #[test]
    fn test_invalid_sync_policy() {
        let err = load(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("API_INDEX_SYNC_POLICY", "sometimes"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "API_INDEX_SYNC_POLICY"));
    }

    #[test]
    fn test_client_ip_header() {
        let config = load(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("API_CLIENT_IP_HEADER", " CF-Connecting-IP "),
        ])
        .unwrap();
        assert_eq!(
            config.client_ip_header,
            Some(HeaderName::from_static("cf-connecting-ip"))
        );

        let err = load(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("API_CLIENT_IP_HEADER", "not a header"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "API_CLIENT_IP_HEADER"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(load(&[("DATABASE_URL", "postgres://x/y"), ("API_TOKEN_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn test_strict_policy_and_json_logs() {
        let config = load(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("API_INDEX_SYNC_POLICY", "strict"),
            ("LOG_FORMAT", "json"),
            ("API_RATE_LIMIT", "false"),
        ])
        .unwrap();
        assert_eq!(config.index_sync_policy, IndexSyncPolicy::Strict);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.rate_limit);
    }

    #[test]
    fn test_allowed_origins_exact_and_suffix() {
        let origins = AllowedOrigins {
            exact: vec!["http://localhost:3000".to_owned()],
            host_suffixes: vec![".netlify.app".to_owned()],
        };

        assert!(origins.allows("http://localhost:3000"));
        assert!(origins.allows("https://deploy-preview-12--site.netlify.app"));
        assert!(!origins.allows("http://localhost:4000"));
        assert!(!origins.allows("https://netlify.app.evil.com"));
        assert!(!origins.allows("ftp://files.netlify.app"));
        assert!(!origins.allows("not a url"));
    }

    #[test]
    fn test_origin_list_strips_trailing_slash() {
        let config = load(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("API_ALLOWED_ORIGINS", "https://app.example.com/, ,http://localhost:3000"),
        ])
        .unwrap();
        assert_eq!(
            config.cors.exact,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }
}
