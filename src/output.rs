//! Response bodies printed by the CLI.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::aggregator::Aggregation;
use crate::providers::Coord;

/// Result of one aggregation call, as printed by `weather`.
#[derive(Debug, Serialize)]
pub struct WeatherReport {
    pub city: String,
    /// Mean temperature in Celsius.
    pub temp: f64,
    pub took: String,
    pub observed_at: DateTime<Utc>,
    pub providers: Vec<String>,
    pub succeeded: usize,
    pub total: usize,
}

impl WeatherReport {
    pub fn new(city: &str, aggregation: Aggregation, providers: Vec<String>, took: Duration) -> Self {
        Self {
            city: city.to_string(),
            temp: aggregation.celsius,
            took: format!("{took:?}"),
            observed_at: Utc::now(),
            providers,
            succeeded: aggregation.succeeded,
            total: aggregation.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoordinatesReport {
    pub city: String,
    pub coord: Coord,
}

/// Prints a value to stdout as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    debug!(bytes = body.len(), "Writing JSON response");
    println!("{body}");
    Ok(())
}
