use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProviderConfig;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::provider::TemperatureProvider;
use crate::units::kelvin_to_celsius;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Geographic position of a city, as reported by OpenWeatherMap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    /// Kelvin, the API's default unit.
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct TemperatureResponse {
    main: MainSection,
}

#[derive(Debug, Deserialize)]
struct CoordinatesResponse {
    coord: Coord,
}

/// Current conditions from OpenWeatherMap, queried by city name.
///
/// Also serves as the geocoder for providers that only accept coordinates.
pub struct OpenWeatherMap {
    client: Box<dyn HttpClient>,
    base_url: String,
}

impl OpenWeatherMap {
    pub fn new(client: impl HttpClient + 'static, base_url: Option<String>) -> Self {
        Self {
            client: Box::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Sends the configured key as the `appid` query parameter, when there is one.
    pub fn from_config(client: BasicClient, config: &ProviderConfig) -> Self {
        let base_url = config.base_url.clone();
        match &config.api_key {
            Some(key) => Self::new(UrlParam::new(client, "appid", key.as_str()), base_url),
            None => Self::new(client, base_url),
        }
    }

    fn weather_url(&self, city: &str) -> Result<Url> {
        Url::parse_with_params(&format!("{}/weather", self.base_url), &[("q", city)])
            .with_context(|| format!("invalid base url '{}'", self.base_url))
    }

    /// Looks up the coordinates of `city`.
    pub async fn coordinates(&self, city: &str) -> Result<Coord> {
        let url = self.weather_url(city)?;
        let resp: CoordinatesResponse = fetch_json(self.client.as_ref(), url.as_str())
            .await
            .with_context(|| format!("openweathermap: coordinates lookup for '{city}'"))?;
        Ok(resp.coord)
    }
}

#[async_trait]
impl TemperatureProvider for OpenWeatherMap {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn temperature(&self, city: &str) -> Result<f64> {
        let url = self.weather_url(city)?;
        let resp: TemperatureResponse = fetch_json(self.client.as_ref(), url.as_str())
            .await
            .with_context(|| format!("openweathermap: temperature for '{city}'"))?;

        let celsius = kelvin_to_celsius(resp.main.temp);
        info!(provider = "openweathermap", city, celsius, "Reading");
        Ok(celsius)
    }
}
