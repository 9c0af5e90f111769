use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::fetch::{HttpClient, fetch_json};
use crate::provider::TemperatureProvider;
use crate::providers::join_path;

pub const DEFAULT_BASE_URL: &str = "http://api.wunderground.com/api";

#[derive(Debug, Deserialize)]
struct Observation {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionsResponse {
    current_observation: Observation,
}

/// Current conditions from Weather Underground. The API key is part of the path.
pub struct WeatherUnderground {
    client: Box<dyn HttpClient>,
    base_url: String,
    api_key: String,
}

impl WeatherUnderground {
    pub fn new(client: impl HttpClient + 'static, base_url: Option<String>, api_key: String) -> Self {
        Self {
            client: Box::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
        }
    }
}

#[async_trait]
impl TemperatureProvider for WeatherUnderground {
    fn name(&self) -> &str {
        "weather_underground"
    }

    async fn temperature(&self, city: &str) -> Result<f64> {
        let file = format!("{city}.json");
        let url = join_path(
            &self.base_url,
            [self.api_key.as_str(), "conditions", "q", file.as_str()],
        )?;

        let resp: ConditionsResponse = fetch_json(self.client.as_ref(), url.as_str())
            .await
            .with_context(|| format!("weather_underground: temperature for '{city}'"))?;

        let celsius = resp.current_observation.temp_c;
        info!(provider = "weather_underground", city, celsius, "Reading");
        Ok(celsius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::Recorder;

    #[test]
    fn test_parse_conditions_response() {
        let body = r#"{"response":{"version":"0.1"},"current_observation":{"temp_c":18.4,"temp_f":65.1}}"#;
        let resp: ConditionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.current_observation.temp_c, 18.4);
    }

    #[test]
    fn test_error_body_is_a_parse_error() {
        let body = r#"{"response":{"error":{"type":"keynotfound"}}}"#;
        assert!(serde_json::from_str::<ConditionsResponse>(body).is_err());
    }

    #[tokio::test]
    async fn test_key_and_city_in_path() {
        let recorder = Recorder::default();
        let wu = WeatherUnderground::new(recorder.clone(), None, "abc123".into());

        assert!(wu.temperature("Berlin").await.is_err());
        assert_eq!(
            recorder.urls(),
            ["http://api.wunderground.com/api/abc123/conditions/q/Berlin.json"]
        );
    }
}
