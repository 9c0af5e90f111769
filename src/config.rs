//! Provider configuration.
//!
//! Stored as a JSON object on disk:
//! ```json
//! {
//!   "timeout_secs": 10,
//!   "request_timeout_secs": 4,
//!   "openweathermap": { "api_key": "..." },
//!   "weather_underground": { "api_key": "...", "enabled": false },
//!   "forecast_io": { "api_key": "...", "base_url": "https://api.forecast.io/forecast" }
//! }
//! ```
//! Any section may be omitted. Without a file, [`Config::from_env`] reads the
//! keys from environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::aggregator::ProviderSet;
use crate::fetch::BasicClient;
use crate::providers::{ForecastIo, OpenWeatherMap, WeatherUnderground};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 4;

/// Settings for one upstream weather API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Overrides the provider's public endpoint (useful for proxies and tests).
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            api_key: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deadline for one whole aggregation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Deadline for each HTTP request a provider makes. Kept below
    /// `timeout_secs` so a slow upstream fails on its own first.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub openweathermap: ProviderConfig,

    #[serde(default)]
    pub weather_underground: ProviderConfig,

    #[serde(default)]
    pub forecast_io: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            openweathermap: ProviderConfig::default(),
            weather_underground: ProviderConfig::default(),
            forecast_io: ProviderConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every aggregation fail.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Builds a config from `OPENWEATHERMAP_API_KEY`, `WUNDERGROUND_API_KEY`,
    /// `FORECAST_IO_API_KEY`, `WEATHER_TIMEOUT_SECS` and
    /// `WEATHER_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secs = |name: &str, default: u64| -> Result<u64> {
            match lookup(name) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{name} is not a number: '{raw}'")),
                None => Ok(default),
            }
        };

        let config = Self {
            timeout_secs: secs("WEATHER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            request_timeout_secs: secs("WEATHER_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            openweathermap: ProviderConfig {
                api_key: key("OPENWEATHERMAP_API_KEY"),
                ..Default::default()
            },
            weather_underground: ProviderConfig {
                api_key: key("WUNDERGROUND_API_KEY"),
                ..Default::default()
            },
            forecast_io: ProviderConfig {
                api_key: key("FORECAST_IO_API_KEY"),
                ..Default::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds an OpenWeatherMap client from the `openweathermap` section.
    ///
    /// It is built even when the section is disabled, since Forecast.io
    /// relies on it for geocoding.
    pub fn openweathermap(&self) -> Result<OpenWeatherMap> {
        let client = BasicClient::with_timeout(self.request_timeout())?;
        Ok(OpenWeatherMap::from_config(client, &self.openweathermap))
    }

    /// Instantiates every enabled provider, in a fixed order.
    ///
    /// Providers that need an API key are skipped when none is configured.
    pub fn build_providers(&self) -> Result<ProviderSet> {
        let mut providers: ProviderSet = Vec::new();
        let geocoder = Arc::new(self.openweathermap()?);

        if self.openweathermap.enabled {
            providers.push(geocoder.clone());
        }

        if self.weather_underground.enabled {
            match &self.weather_underground.api_key {
                Some(key) => providers.push(Arc::new(WeatherUnderground::new(
                    BasicClient::with_timeout(self.request_timeout())?,
                    self.weather_underground.base_url.clone(),
                    key.clone(),
                ))),
                None => warn!(provider = "weather_underground", "No API key configured, skipping"),
            }
        }

        if self.forecast_io.enabled {
            match &self.forecast_io.api_key {
                Some(key) => providers.push(Arc::new(ForecastIo::new(
                    BasicClient::with_timeout(self.request_timeout())?,
                    self.forecast_io.base_url.clone(),
                    key.clone(),
                    geocoder,
                ))),
                None => warn!(provider = "forecast_io", "No API key configured, skipping"),
            }
        }

        debug!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Providers configured"
        );

        Ok(providers)
    }
}
