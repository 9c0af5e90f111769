//! Trait implemented by every source of temperature readings.

use anyhow::Result;
use async_trait::async_trait;

/// A source of the current temperature for a named location.
///
/// Implementations must return degrees Celsius. How a reading is obtained
/// (HTTP, parsing, credentials) is entirely the implementation's business;
/// callers treat any error as "no reading from this provider".
#[async_trait]
pub trait TemperatureProvider: Send + Sync {
    /// Short, stable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Returns the current temperature at `location` in Celsius.
    async fn temperature(&self, location: &str) -> Result<f64>;
}
