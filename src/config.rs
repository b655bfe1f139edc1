use std::{env, fmt::Display, str::FromStr, time::Duration};

use jsonwebtoken::Algorithm;
use thiserror::Error;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "jwt_secret_key_local";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
    Disabled,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "none" | "off" | "disabled" => Ok(Self::Disabled),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub redis_url: String,
    pub cache_backend: CacheBackendKind,
    pub cache_ttl: Duration,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub jwt_lifetime: Duration,
    pub production: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the local development secret");
            DEV_JWT_SECRET.to_string()
        });
        if production && jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: "the development secret cannot be used in production".into(),
            });
        }

        let jwt_algorithm = parse_algorithm(&try_load::<String>("JWT_ALGORITHM", "HS256")?)?;
        let jwt_lifetime = token_lifetime(try_load("JWT_EXPIRATION_HOURS", "1")?)?;
        let cache_ttl_secs: u64 = try_load("CACHE_TTL_SECS", "300")?;

        Ok(Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:3000")?,
            database_url: try_load("DATABASE_URL", "sqlite://users.db?mode=rwc")?,
            redis_url: try_load("REDIS_URL", "redis://localhost:6379/0")?,
            cache_backend: try_load("CACHE_BACKEND", "redis")?,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            jwt_secret,
            jwt_algorithm,
            jwt_lifetime,
            production,
            admin_username: var("ADMIN_USERNAME"),
            admin_password: var("ADMIN_PASSWORD"),
        })
    }

    /// Settings for tests and local tooling: in-memory cache, dev secret.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            redis_url: String::new(),
            cache_backend: CacheBackendKind::Memory,
            cache_ttl: Duration::from_secs(300),
            jwt_secret: "test-secret".into(),
            jwt_algorithm: Algorithm::HS256,
            jwt_lifetime: Duration::from_secs(3600),
            production: false,
            admin_username: None,
            admin_password: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}

/// Token lifetime in hours; `exp` is an `i64` timestamp so the span must fit one.
fn token_lifetime(hours: u64) -> Result<Duration, ConfigError> {
    hours
        .checked_mul(3600)
        .filter(|secs| i64::try_from(*secs).is_ok())
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            key: "JWT_EXPIRATION_HOURS",
            reason: format!("{hours} hours is too long"),
        })
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::Invalid {
            key: "JWT_ALGORITHM",
            reason: format!("unsupported algorithm `{other}`, expected HS256, HS384 or HS512"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hmac_algorithms_case_insensitively() {
        assert_eq!(parse_algorithm("hs384").unwrap(), Algorithm::HS384);
        assert!(parse_algorithm("RS256").is_err());
    }

    #[test]
    fn token_lifetime_rejects_overflow() {
        assert_eq!(token_lifetime(2).unwrap(), Duration::from_secs(7200));
        assert!(token_lifetime(u64::MAX).is_err());
        assert!(token_lifetime(u64::MAX / 3600).is_err());
    }

    #[test]
    fn parses_cache_backend_names() {
        assert_eq!("Redis".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Redis));
        assert_eq!("none".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Disabled));
        assert!("memcached".parse::<CacheBackendKind>().is_err());
    }
}
