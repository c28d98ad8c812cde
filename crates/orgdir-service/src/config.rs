//! Environment configuration.
//!
//! | Variable                      | Default                  |
//! |-------------------------------|--------------------------|
//! | `REDIS_URL`                   | `redis://127.0.0.1:6379` |
//! | `DATABASE_URL`                | unset (in-memory store)  |
//! | `ORGDIR_CACHE_TIMEOUT_MS`     | `200`                    |
//! | `ORGDIR_PUBLIC_BASE_URL`      | empty                    |
//! | `ORGDIR_RETRACT_AUTOCOMPLETE` | `true`                   |
//!
//! A variable that is set but malformed is an error, never a silent default.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use orgdir_cache::SyncConfig;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Process-level settings for the write path.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub redis_url: String,
    pub database_url: Option<String>,
    pub cache_timeout: Duration,
    pub public_base_url: String,
    pub retract_ineligible_autocomplete: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            database_url: None,
            cache_timeout: orgdir_cache::sync::DEFAULT_TIMEOUT,
            public_base_url: String::new(),
            retract_ineligible_autocomplete: true,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, organizations are kept in memory only");
        }
        let timeout_ms: u64 = try_load(&lookup, "ORGDIR_CACHE_TIMEOUT_MS", "200")?;
        Ok(Self {
            redis_url: try_load(&lookup, "REDIS_URL", DEFAULT_REDIS_URL)?,
            database_url,
            cache_timeout: Duration::from_millis(timeout_ms),
            public_base_url: try_load(&lookup, "ORGDIR_PUBLIC_BASE_URL", "")?,
            retract_ineligible_autocomplete: try_load(&lookup, "ORGDIR_RETRACT_AUTOCOMPLETE", "true")?,
        })
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            timeout: self.cache_timeout,
            public_base_url: self.public_base_url.clone(),
            retract_ineligible_autocomplete: self.retract_ineligible_autocomplete,
        }
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default:?}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
