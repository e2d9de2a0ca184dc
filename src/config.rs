//! Service configuration loaded from environment variables.
//!
//! `.env` files are honoured through `dotenvy` in `main`.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - HMAC key for access/refresh tokens (min 32 chars)
//!
//! ## Optional
//! - `DATABASE_URL` - `PostgreSQL` connection string; without it the service
//!   runs on the in-memory store
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `HOST` - bind address (default: 0.0.0.0)
//! - `PORT` - listen port (default: 8083)
//! - `ACCESS_TOKEN_TTL_SECS` - access token lifetime (default: 300)
//! - `REFRESH_TOKEN_TTL_SECS` - refresh token lifetime (default: 86400)
//! - `FREIGHT_PRICE` - flat per-item cart freight (default: 10.00)
//! - `PAGE_SIZE` - default list page size (default: 10, max 100)
//! - `NATS_URL` - event bus for order/cart events

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::value_objects::Money;
use crate::store::PageRequest;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    /// HMAC key for access/refresh tokens
    pub jwt_secret: SecretString,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub freight_price: Money,
    pub page_size: u32,
    pub nats_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first missing or malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first missing or malformed variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".into()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_SECRET".into(),
                format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
            ));
        }

        let freight_price = parse_or(&get, "FREIGHT_PRICE", Decimal::new(1_000, 2)).map(Money::new)?;
        freight_price
            .check()
            .map_err(|e| ConfigError::InvalidEnvVar("FREIGHT_PRICE".into(), e.to_string()))?;

        let page_size: u32 = parse_or(&get, "PAGE_SIZE", 10)?;
        if page_size == 0 || page_size > PageRequest::MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "PAGE_SIZE".into(),
                format!("must be between 1 and {}", PageRequest::MAX_PAGE_SIZE),
            ));
        }

        let access_token_ttl_secs = positive(parse_or(&get, "ACCESS_TOKEN_TTL_SECS", 300)?, "ACCESS_TOKEN_TTL_SECS")?;
        let refresh_token_ttl_secs = positive(parse_or(&get, "REFRESH_TOKEN_TTL_SECS", 86_400)?, "REFRESH_TOKEN_TTL_SECS")?;

        Ok(Self {
            database_url: get("DATABASE_URL").map(SecretString::from),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: parse_or(&get, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&get, "PORT", 8083)?,
            jwt_secret: SecretString::from(jwt_secret),
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            freight_price,
            page_size,
            nats_url: get("NATS_URL"),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn positive(value: i64, key: &str) -> Result<i64, ConfigError> {
    if value > 0 { Ok(value) } else { Err(ConfigError::InvalidEnvVar(key.to_string(), "must be positive".into())) }
}
