//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `DATABASE_URL` - `PostgreSQL` connection string; absent means in-memory storage
//! - `JWT_SECRET` - Token signing secret (insecure dev default with a warning)
//! - `TOKEN_TTL_DAYS` - Token lifetime in days, 1 to 3650 (default: 30)
//! - `CORS_ORIGIN` - Allowed frontend origin (default: http://localhost:5173)
//! - `ADMIN_EMAIL` - Registering with this email grants the admin role

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use secrecy::SecretString;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "storefront-dev-secret";
/// Ten years.
const MAX_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: IpAddr,
    pub port: u16,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    pub jwt_secret: SecretString,
    pub token_ttl: chrono::Duration,
    pub cors_origin: HeaderValue,
    /// Normalized (trimmed, lowercase) bootstrap admin email.
    pub admin_email: Option<String>,
}

impl ApiConfig {
    /// Load configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = parse_or(get("HOST"), "HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_or(get("PORT"), "PORT", 5000u16)?;

        let ttl_days = parse_or(get("TOKEN_TTL_DAYS"), "TOKEN_TTL_DAYS", 30i64)?;
        let token_ttl = Some(ttl_days)
            .filter(|days| (1..=MAX_TOKEN_TTL_DAYS).contains(days))
            .and_then(chrono::Duration::try_days)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "TOKEN_TTL_DAYS".to_string(),
                    format!("must be between 1 and {MAX_TOKEN_TTL_DAYS} days"),
                )
            })?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_origin = get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());
        let cors_origin = HeaderValue::from_str(&cors_origin)
            .map_err(|e| ConfigError::InvalidEnvVar("CORS_ORIGIN".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            database_url: get("DATABASE_URL").map(SecretString::from),
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl,
            cors_origin,
            admin_email: get("ADMIN_EMAIL").map(|e| storefront_auth::normalize_email(&e)),
        })
    }

    /// Returns the socket address for binding the server.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
