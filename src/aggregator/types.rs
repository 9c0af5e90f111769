//! Data types used by the aggregation pipeline.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::provider::TemperatureProvider;

/// Ordered providers queried by one aggregation call.
pub type ProviderSet = Vec<Arc<dyn TemperatureProvider>>;

/// How many provider failures an aggregation tolerates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationPolicy {
    /// Every provider must succeed; the first failure is returned as-is.
    #[default]
    Strict,
    /// At least this many providers must succeed; failures are logged and
    /// the mean is taken over the successful readings only.
    AtLeast(usize),
}

impl AggregationPolicy {
    /// Number of successful readings needed out of `total`.
    pub fn required(&self, total: usize) -> usize {
        match *self {
            AggregationPolicy::Strict => total,
            AggregationPolicy::AtLeast(n) => n.max(1),
        }
    }
}

/// Combined reading produced by a successful aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregation {
    /// Mean temperature in Celsius.
    pub celsius: f64,
    /// Providers that contributed a reading.
    pub succeeded: usize,
    /// Providers queried.
    pub total: usize,
}

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("no providers configured")]
    NoProviders,

    #[error("{provider} failed for '{location}'")]
    Provider {
        provider: String,
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("provider task for {provider} did not finish: {reason}")]
    TaskFailed { provider: String, reason: String },

    #[error("aggregation for '{location}' timed out after {after:?}")]
    Timeout { location: String, after: Duration },

    #[error("only {succeeded} of {total} providers succeeded, {required} required")]
    InsufficientCoverage {
        succeeded: usize,
        required: usize,
        total: usize,
    },
}

impl AggregateError {
    /// Name of the provider responsible for the failure, when there is one.
    pub fn provider(&self) -> Option<&str> {
        match self {
            AggregateError::Provider { provider, .. }
            | AggregateError::TaskFailed { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_requires_every_provider() {
        assert_eq!(AggregationPolicy::Strict.required(3), 3);
        assert_eq!(AggregationPolicy::default(), AggregationPolicy::Strict);
    }

    #[test]
    fn test_at_least_never_requires_zero() {
        assert_eq!(AggregationPolicy::AtLeast(0).required(3), 1);
        assert_eq!(AggregationPolicy::AtLeast(2).required(3), 2);
    }

    #[test]
    fn test_provider_error_keeps_underlying_message() {
        let err = AggregateError::Provider {
            provider: "openweathermap".into(),
            location: "Paris".into(),
            source: anyhow::anyhow!("upstream returned status 401"),
        };

        assert_eq!(err.provider(), Some("openweathermap"));
        assert_eq!(err.to_string(), "openweathermap failed for 'Paris'");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches("upstream returned status 401").count(), 1);
    }

    #[test]
    fn test_configuration_error_has_no_provider() {
        assert!(AggregateError::NoProviders.provider().is_none());
        assert_eq!(AggregateError::NoProviders.to_string(), "no providers configured");
    }
}
