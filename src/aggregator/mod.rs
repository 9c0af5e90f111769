//! Concurrent fan-out over a set of temperature providers.
//!
//! [`aggregate`] queries every provider at once and returns the mean of their
//! readings, failing fast on the first provider error. [`MultiProvider`]
//! wraps a provider set so it can be used anywhere a single
//! [`TemperatureProvider`](crate::provider::TemperatureProvider) is expected.

pub mod aggregate;
pub mod multi;
pub mod types;

pub use aggregate::{aggregate, aggregate_with_policy, aggregate_with_timeout};
pub use multi::MultiProvider;
pub use types::{AggregateError, Aggregation, AggregationPolicy, ProviderSet};
