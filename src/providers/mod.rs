//! Concrete temperature providers backed by public weather APIs.
//!
//! Each provider converts its upstream unit into Celsius before returning.

mod forecast_io;
mod openweathermap;
mod weather_underground;

pub use forecast_io::ForecastIo;
pub use openweathermap::{Coord, OpenWeatherMap};
pub use weather_underground::WeatherUnderground;

use anyhow::{Context, Result};
use reqwest::Url;

/// Appends `segments` to the path of `base`, percent-encoding each one.
fn join_path<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid base url '{base}'"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("base url '{base}' cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::fetch::HttpClient;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every URL requested and fails without touching the network.
    #[derive(Clone, Default)]
    pub struct Recorder(pub Arc<Mutex<Vec<String>>>);

    impl Recorder {
        pub fn urls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for Recorder {
        async fn execute(&self, req: reqwest::Request) -> anyhow::Result<reqwest::Response> {
            self.0.lock().unwrap().push(req.url().to_string());
            Err(anyhow::anyhow!("network disabled in tests"))
        }
    }
}
