use crate::error::ConfigError;
use crate::model::Granularity;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use std::str::FromStr;

pub const DEFAULT_PORTAL_URL: &str =
    "https://kundenportal.tinetz.at/powercommerce/tinetz/fo/portal";

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

/// Reads a prefixed config section, naming the full variable when one is missing.
fn from_env<T: DeserializeOwned>(prefix: &str) -> Result<T, ConfigError> {
    envy::prefixed(prefix)
        .from_env::<T>()
        .map_err(|err| match err {
            envy::Error::MissingValue(field) => {
                ConfigError::missing(format!("{}{}", prefix, field.to_uppercase()))
            }
            other => ConfigError::env_parse(other),
        })
}

pub(crate) fn load_app_config() -> Result<AppConfig> {
    from_env::<AppConfig>("").context("Failed to load AppConfig")
}

fn default_granularities() -> Vec<Granularity> {
    Granularity::all().to_vec()
}

#[derive(Deserialize, Debug)]
pub struct FetchConfig {
    // lookback window in whole days
    pub days: u64,
    #[serde(default = "default_granularities")]
    pub granularities: Vec<Granularity>,
}

pub(crate) fn load_fetch_config() -> Result<FetchConfig> {
    let config = from_env::<FetchConfig>("FETCH_").context("Failed to load FetchConfig")?;
    if config.granularities.is_empty() {
        return Err(ConfigError::invalid(
            "FETCH_GRANULARITIES",
            "at least one granularity is required",
        ))
        .context("Failed to load FetchConfig");
    }
    Ok(config)
}

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct PortalConfig {
    #[serde(default = "default_portal_url")]
    pub url: String,
    pub user: String,
    #[serde(rename = "pw")]
    pub password: String,
    pub contract: String,
    pub meter: String,
}

pub(crate) fn load_portal_config() -> Result<PortalConfig> {
    from_env::<PortalConfig>("PORTAL_").context("Failed to load PortalConfig")
}

#[derive(Deserialize, Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub measurement_prefix: String,
}

pub fn load_influx_config() -> Result<InfluxConfig> {
    from_env::<InfluxConfig>("INFLUXDB_").context("Failed to load InfluxConfig")
}
