use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::fetch::{HttpClient, fetch_json};
use crate::provider::TemperatureProvider;
use crate::providers::join_path;
use crate::providers::openweathermap::{Coord, OpenWeatherMap};
use crate::units::fahrenheit_to_celsius;

pub const DEFAULT_BASE_URL: &str = "https://api.forecast.io/forecast";

#[derive(Debug, Deserialize)]
struct Currently {
    /// Fahrenheit.
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    currently: Currently,
}

/// Current conditions from Forecast.io.
///
/// The API only accepts coordinates, so each query first resolves the city
/// through OpenWeatherMap.
pub struct ForecastIo {
    client: Box<dyn HttpClient>,
    base_url: String,
    api_key: String,
    geocoder: Arc<OpenWeatherMap>,
}

impl ForecastIo {
    pub fn new(
        client: impl HttpClient + 'static,
        base_url: Option<String>,
        api_key: String,
        geocoder: Arc<OpenWeatherMap>,
    ) -> Self {
        Self {
            client: Box::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            geocoder,
        }
    }

    fn forecast_url(&self, coord: Coord) -> Result<reqwest::Url> {
        let position = format!("{:.2},{:.2}", coord.lat, coord.lon);
        join_path(&self.base_url, [self.api_key.as_str(), position.as_str()])
    }
}

#[async_trait]
impl TemperatureProvider for ForecastIo {
    fn name(&self) -> &str {
        "forecast_io"
    }

    async fn temperature(&self, city: &str) -> Result<f64> {
        let coord = self.geocoder.coordinates(city).await?;
        let url = self.forecast_url(coord)?;

        let resp: ForecastResponse = fetch_json(self.client.as_ref(), url.as_str())
            .await
            .with_context(|| format!("forecast_io: temperature for '{city}'"))?;

        let celsius = fahrenheit_to_celsius(resp.currently.temperature);
        info!(provider = "forecast_io", city, celsius, "Reading");
        Ok(celsius)
    }
}
