use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_days: i64,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.database.max_connections)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.database.min_connections)?,
            acquire_timeout: Duration::from_millis(env_or(
                "DB_ACQUIRE_TIMEOUT_MS",
                defaults.database.acquire_timeout.as_millis() as u64,
            )?),
            idle_timeout: Duration::from_millis(env_or(
                "DB_IDLE_TIMEOUT_MS",
                defaults.database.idle_timeout.as_millis() as u64,
            )?),
        };

        let auth = AuthConfig {
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            token_expiry_days: env_or("JWT_EXPIRY_DAYS", defaults.auth.token_expiry_days)?,
        };

        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(origins) => parse_origins(&origins),
            Err(_) => defaults.cors_origins,
        };

        Ok(Config {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port)?,
            database,
            auth,
            cors_origins,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cors_origins: vec!["http://localhost:8080".to_string()],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: "sqlite://qa_forum.db".to_string(),
            max_connections: 5,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            jwt_secret: "change-me-in-production".to_string(),
            token_expiry_days: 90,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {value}")),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
