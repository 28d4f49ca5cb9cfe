// Application configuration
// Read once at startup from the environment (optionally seeded from a .env file)

use std::str::FromStr;

/// Errors raised while reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration of the order intake service
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// When absent, admission control keeps its counters in process memory
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Routing header set by the edge from the storefront subdomain
    pub tenant_header: String,
    pub rate_limit: RateLimitConfig,
}

/// Fixed-window admission control settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let defaults = RateLimitConfig::default();

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            tenant_header: lookup("TENANT_HEADER")
                .map(|v| v.to_ascii_lowercase())
                .unwrap_or_else(|| "x-tenant-slug".to_string()),
            rate_limit: RateLimitConfig {
                max_requests: parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?,
                window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", defaults.window_secs)?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
