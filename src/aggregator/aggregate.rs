use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, warn};

use crate::aggregator::types::{AggregateError, Aggregation, AggregationPolicy};
use crate::provider::TemperatureProvider;
use crate::units::mean;

/// Queries every provider concurrently and returns the mean reading.
///
/// All providers must succeed. The first failure to arrive is returned
/// verbatim and the remaining queries are cancelled.
///
/// # Errors
///
/// [`AggregateError::NoProviders`] for an empty set, otherwise the first
/// provider failure observed.
pub async fn aggregate(
    providers: &[Arc<dyn TemperatureProvider>],
    location: &str,
) -> Result<f64, AggregateError> {
    aggregate_with_policy(providers, location, AggregationPolicy::Strict)
        .await
        .map(|a| a.celsius)
}

/// Like [`aggregate_with_policy`], bounded by an overall deadline.
///
/// When the deadline expires every in-flight query is cancelled. Under
/// [`AggregationPolicy::AtLeast`] the readings collected so far are averaged
/// if there are enough of them; otherwise [`AggregateError::Timeout`] is
/// returned.
pub async fn aggregate_with_timeout(
    providers: &[Arc<dyn TemperatureProvider>],
    location: &str,
    policy: AggregationPolicy,
    deadline: Duration,
) -> Result<Aggregation, AggregateError> {
    fan_out(providers, location, policy, Some(deadline)).await
}

/// Queries every provider concurrently and combines the readings under `policy`.
///
/// One task is spawned per provider. Readings and failures come back on two
/// channels sized to the provider count, so a task never waits on the
/// aggregator, and are consumed in arrival order. Returning early aborts the
/// tasks still running.
pub async fn aggregate_with_policy(
    providers: &[Arc<dyn TemperatureProvider>],
    location: &str,
    policy: AggregationPolicy,
) -> Result<Aggregation, AggregateError> {
    fan_out(providers, location, policy, None).await
}

#[tracing::instrument(skip(providers), fields(providers = providers.len()))]
async fn fan_out(
    providers: &[Arc<dyn TemperatureProvider>],
    location: &str,
    policy: AggregationPolicy,
    deadline: Option<Duration>,
) -> Result<Aggregation, AggregateError> {
    let total = providers.len();
    if total == 0 {
        return Err(AggregateError::NoProviders);
    }

    let required = policy.required(total);
    if required > total {
        return Err(AggregateError::InsufficientCoverage {
            succeeded: 0,
            required,
            total,
        });
    }

    let expires_at = deadline.map(|d| Instant::now() + d);

    let (temps_tx, mut temps_rx) = mpsc::channel::<f64>(total);
    let (errs_tx, mut errs_rx) = mpsc::channel::<AggregateError>(total);

    let mut tasks = JoinSet::new();
    let mut names = HashMap::with_capacity(total);

    for provider in providers {
        let provider = Arc::clone(provider);
        let name = provider.name().to_string();
        let location = location.to_string();
        let temps_tx = temps_tx.clone();
        let errs_tx = errs_tx.clone();

        let span = info_span!("provider_query", provider = %name, location = %location);

        let handle = tasks.spawn(
            async move {
                // Sends fail only once the aggregator has already returned.
                match provider.temperature(&location).await {
                    Ok(celsius) => {
                        debug!(celsius, "Provider reading received");
                        let _ = temps_tx.send(celsius).await;
                    }
                    Err(source) => {
                        debug!(error = %source, "Provider query failed");
                        let _ = errs_tx
                            .send(AggregateError::Provider {
                                provider: provider.name().to_string(),
                                location,
                                source,
                            })
                            .await;
                    }
                }
            }
            .instrument(span),
        );
        names.insert(handle.id(), name);
    }

    // Only the tasks hold senders now.
    drop(temps_tx);
    drop(errs_tx);

    debug!(total, required, "Provider queries spawned");

    let mut tally = Tally {
        readings: Vec::with_capacity(total),
        failures: 0,
        total,
        required,
        policy,
    };

    while tally.pending() > 0 {
        tokio::select! {
            Some(celsius) = temps_rx.recv() => tally.readings.push(celsius),
            Some(err) = errs_rx.recv() => {
                if let Err(err) = tally.fail(err) {
                    return Err(abandon(&mut tasks, err));
                }
            }
            Some(joined) = tasks.join_next() => {
                // A task that ends without sending has panicked or been aborted.
                if let Err(e) = joined {
                    let err = AggregateError::TaskFailed {
                        provider: names.get(&e.id()).cloned().unwrap_or_default(),
                        reason: e.to_string(),
                    };
                    if let Err(err) = tally.fail(err) {
                        return Err(abandon(&mut tasks, err));
                    }
                }
            }
            _ = expiry(expires_at) => {
                let after = deadline.unwrap_or_default();
                warn!(
                    location,
                    ?after,
                    succeeded = tally.readings.len(),
                    required,
                    "Aggregation deadline expired, cancelling providers"
                );
                // Only reachable under a partial policy: strict needs every reading.
                if tally.readings.len() >= required {
                    tasks.abort_all();
                    break;
                }
                return Err(abandon(&mut tasks, AggregateError::Timeout {
                    location: location.to_string(),
                    after,
                }));
            }
            else => {
                return Err(AggregateError::TaskFailed {
                    provider: String::new(),
                    reason: "result channels closed before every provider reported".into(),
                });
            }
        }
    }

    tasks.shutdown().await;

    let succeeded = tally.readings.len();
    let celsius = mean(&tally.readings).ok_or(AggregateError::InsufficientCoverage {
        succeeded,
        required,
        total,
    })?;

    debug!(celsius, succeeded, total, "Aggregation complete");

    Ok(Aggregation {
        celsius,
        succeeded,
        total,
    })
}

/// Resolves at `at`, or never when there is no deadline.
async fn expiry(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Running count of the events consumed by one aggregation call.
struct Tally {
    readings: Vec<f64>,
    failures: usize,
    total: usize,
    required: usize,
    policy: AggregationPolicy,
}

impl Tally {
    fn pending(&self) -> usize {
        self.total - self.readings.len() - self.failures
    }

    /// Records a failure, returning the error that ends the aggregation if
    /// the policy can no longer be met.
    fn fail(&mut self, err: AggregateError) -> Result<(), AggregateError> {
        self.failures += 1;

        if self.policy == AggregationPolicy::Strict {
            return Err(err);
        }

        warn!(error = %err, "Provider failed, continuing with the rest");

        if self.total - self.failures < self.required {
            return Err(AggregateError::InsufficientCoverage {
                succeeded: self.readings.len(),
                required: self.required,
                total: self.total,
            });
        }

        Ok(())
    }
}

/// Cancels every provider task still running and hands back `err`.
fn abandon(tasks: &mut JoinSet<()>, err: AggregateError) -> AggregateError {
    if !tasks.is_empty() {
        debug!(in_flight = tasks.len(), "Cancelling remaining provider queries");
    }
    tasks.abort_all();
    err
}
