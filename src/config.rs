// src/config.rs

use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::AppError;

/// Sentinel `target_class` that makes a quiz visible to every cohort.
pub const ALL_COHORTS: &str = "all";

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cohorts: CohortPolicy,
    pub lock_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = get_env("DATABASE_URL")?;
        let jwt_secret = get_env("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => parse_value("BIND_ADDR", &raw)?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let known = match env::var("COHORTS") {
            Ok(raw) => split_list(&raw),
            Err(_) => (1..=12).map(|n| format!("Class{}", n)).collect(),
        };
        let restricted = env::var("RESTRICTED_COHORTS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        let lock_timeout_ms = match env::var("LOCK_TIMEOUT_MS") {
            Ok(raw) => parse_value::<u64>("LOCK_TIMEOUT_MS", &raw)?,
            Err(_) => DEFAULT_LOCK_TIMEOUT_MS,
        };
        if lock_timeout_ms == 0 {
            return Err(AppError::Config(
                "LOCK_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]);

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            cohorts: CohortPolicy::new(known, restricted),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            cors_origins,
        })
    }
}

/// Which class identifiers exist and which of them are cut off from
/// all-cohort content.
#[derive(Debug, Clone, Default)]
pub struct CohortPolicy {
    known: HashSet<String>,
    restricted: HashSet<String>,
}

impl CohortPolicy {
    /// Restricted cohorts are always treated as known.
    pub fn new<K, R>(known: K, restricted: R) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let restricted: HashSet<String> = restricted.into_iter().map(Into::into).collect();
        let mut known: HashSet<String> = known.into_iter().map(Into::into).collect();
        known.extend(restricted.iter().cloned());
        Self { known, restricted }
    }

    pub fn is_known(&self, class: &str) -> bool {
        self.known.contains(class)
    }

    pub fn is_restricted(&self, class: &str) -> bool {
        self.restricted.contains(class)
    }

    /// Whether any cohort is cut off from all-cohort quizzes.
    pub fn has_restricted(&self) -> bool {
        !self.restricted.is_empty()
    }
}

fn get_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Config(format!("{} must be set", name)))
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
