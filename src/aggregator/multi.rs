use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::aggregate::{aggregate_with_policy, aggregate_with_timeout};
use crate::aggregator::types::{AggregateError, Aggregation, AggregationPolicy, ProviderSet};
use crate::provider::TemperatureProvider;

/// A provider set that behaves like a single provider.
///
/// Every call fans out to all wrapped providers; see
/// [`aggregate_with_policy`] for the combining rules.
pub struct MultiProvider {
    providers: ProviderSet,
    policy: AggregationPolicy,
    deadline: Option<Duration>,
}

impl MultiProvider {
    pub fn new(providers: ProviderSet) -> Self {
        Self {
            providers,
            policy: AggregationPolicy::Strict,
            deadline: None,
        }
    }

    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bounds every aggregation call by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn TemperatureProvider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Runs one aggregation call and reports how many providers contributed.
    pub async fn aggregate(&self, location: &str) -> Result<Aggregation, AggregateError> {
        match self.deadline {
            Some(deadline) => {
                aggregate_with_timeout(&self.providers, location, self.policy, deadline).await
            }
            None => aggregate_with_policy(&self.providers, location, self.policy).await,
        }
    }
}

#[async_trait]
impl TemperatureProvider for MultiProvider {
    fn name(&self) -> &str {
        "multi"
    }

    async fn temperature(&self, location: &str) -> Result<f64> {
        Ok(self.aggregate(location).await?.celsius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    #[async_trait]
    impl TemperatureProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn temperature(&self, _location: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_nested_multi_provider() {
        let inner: ProviderSet = vec![Arc::new(Fixed(10.0)), Arc::new(Fixed(20.0))];
        let outer: ProviderSet = vec![Arc::new(MultiProvider::new(inner)), Arc::new(Fixed(30.0))];
        let outer = MultiProvider::new(outer);

        assert_eq!(outer.len(), 2);
        assert_eq!(outer.temperature("Tokyo").await.unwrap(), 22.5);
    }

    #[tokio::test]
    async fn test_empty_multi_provider_fails() {
        let multi = MultiProvider::new(Vec::new());

        assert!(multi.is_empty());
        let err = multi.temperature("Tokyo").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AggregateError>(),
            Some(AggregateError::NoProviders)
        ));
    }
}
