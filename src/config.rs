use std::{env, fmt::Display, str::FromStr, sync::Arc};

use log::{info, warn};
use thiserror::Error;

use crate::constants::DEFAULT_PAGE_SIZE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {info}")]
    Invalid { key: &'static str, info: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    /// HMAC key for session cookies, see [`Settings::session_key`].
    pub session_secret: String,
    /// Page size used by `PageRequest::from_form` when `limit` is absent.
    pub page_size: i64,
    pub max_connections: u32,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; `load` reads the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size: i64 = try_load(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                info: format!("{page_size} is below 1"),
            });
        }

        Ok(Self {
            database_url: require(&lookup, "DATABASE_URL")?,
            session_secret: require(&lookup, "SESSION_SECRET")?,
            page_size,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
        })
    }

    /// Key shared by the session filters `with_viewer` and `with_user`.
    pub fn session_key(&self) -> Arc<[u8]> {
        Arc::from(self.session_secret.as_bytes())
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            warn!("Environment variable {key} not found");
            ConfigError::Missing(key)
        })
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                info: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
