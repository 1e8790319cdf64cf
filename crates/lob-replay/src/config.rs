//! Configuration for the replay tool.
//!
//! Defaults can be overridden via environment variables; CLI flags win
//! over both:
//!
//! - `LOB_EXPIRY_ZONE` (default: "America/New_York")
//! - `LOB_EXPIRY_TIME` (default: "16:00:00")

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use lob_core::EngineConfig;

/// Build an [`EngineConfig`] from the environment, falling back to the
/// engine defaults.
pub fn from_env() -> Result<EngineConfig> {
    let defaults = EngineConfig::default();
    let expiry_zone = env::var("LOB_EXPIRY_ZONE").unwrap_or(defaults.expiry_zone);
    let expiry_time = read_env_or_default("LOB_EXPIRY_TIME", defaults.expiry_time)?;
    Ok(EngineConfig {
        expiry_zone,
        expiry_time,
    })
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("invalid {key}: {value:?}")),
        Err(_) => Ok(default),
    }
}
