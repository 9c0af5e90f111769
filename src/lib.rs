pub mod aggregator;
pub mod config;
pub mod fetch;
pub mod output;
pub mod provider;
pub mod providers;
pub mod units;

pub use aggregator::{AggregateError, Aggregation, AggregationPolicy, MultiProvider, aggregate};
pub use provider::TemperatureProvider;
