/*
 * Responsibility
 * - Load settings from the environment (.env is honoured via dotenvy)
 * - Validate values (fail startup when something is malformed)
 * - JWT_SECRET has a fixed development fallback; it is never safe in production
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::auth::Algorithm;

pub const DEFAULT_JWT_SECRET: &str = "homes-api-dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    // Exposes internal error detail in 500 bodies and enables /debug routes.
    pub app_debug: bool,
    pub abort_on_panic: bool,

    pub cors_allowed_origins: Vec<String>,

    // Postgres user store; in-memory store when absent.
    pub database_url: Option<String>,

    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub token_leeway_seconds: i64,
    // Token lifetimes (seconds)
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the secret or the database credentials
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("app_debug", &self.app_debug)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("database", &self.database_url.is_some())
            .field("jwt_algorithm", &self.jwt_algorithm)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            app_env: AppEnv::Development,
            app_debug: false,
            abort_on_panic: false,
            cors_allowed_origins: Vec::new(),
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_algorithm: Algorithm::HS256,
            token_leeway_seconds: 0,
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 7 * 24 * 3600,
            reset_token_ttl_seconds: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let port: u16 = match std::env::var("PORT") {
            Ok(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => defaults.addr.port(),
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();
        let app_debug = env_flag("APP_DEBUG");
        let abort_on_panic = env_flag("ABORT_ON_PANIC");

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                if app_env.is_production() {
                    return Err(ConfigError::Missing("JWT_SECRET"));
                }
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let jwt_algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(s) => s
                .parse::<Algorithm>()
                .map_err(|_| ConfigError::Invalid("JWT_ALGORITHM"))?,
            Err(_) => defaults.jwt_algorithm,
        };

        Ok(Self {
            addr,
            app_env,
            app_debug,
            abort_on_panic,
            cors_allowed_origins,
            database_url,
            jwt_secret,
            jwt_algorithm,
            token_leeway_seconds: env_seconds("TOKEN_LEEWAY_SECONDS", defaults.token_leeway_seconds)?,
            access_token_ttl_seconds: env_seconds(
                "ACCESS_TOKEN_TTL_SECONDS",
                defaults.access_token_ttl_seconds,
            )?,
            refresh_token_ttl_seconds: env_seconds(
                "REFRESH_TOKEN_TTL_SECONDS",
                defaults.refresh_token_ttl_seconds,
            )?,
            reset_token_ttl_seconds: env_seconds(
                "RESET_TOKEN_TTL_SECONDS",
                defaults.reset_token_ttl_seconds,
            )?,
        })
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Upper bound for any TTL or leeway: ten years.
pub const MAX_SECONDS: i64 = 10 * 365 * 24 * 3600;

fn env_seconds(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(key) {
        Ok(v) => parse_seconds(&v).ok_or(ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

fn parse_seconds(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| (0..=MAX_SECONDS).contains(n))
}
