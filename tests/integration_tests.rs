use async_trait::async_trait;
use multi_weather::aggregator::aggregate_with_policy;
use multi_weather::config::Config;
use multi_weather::{AggregateError, AggregationPolicy, MultiProvider, TemperatureProvider, aggregate};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Returns a fixed reading or error after an optional delay.
struct Scripted {
    name: &'static str,
    delay: Duration,
    reading: Result<f64, &'static str>,
}

impl Scripted {
    fn ok(name: &'static str, celsius: f64) -> Arc<dyn TemperatureProvider> {
        Arc::new(Self {
            name,
            delay: Duration::ZERO,
            reading: Ok(celsius),
        })
    }

    fn err(name: &'static str, msg: &'static str) -> Arc<dyn TemperatureProvider> {
        Arc::new(Self {
            name,
            delay: Duration::ZERO,
            reading: Err(msg),
        })
    }

    fn slow(name: &'static str, celsius: f64, delay: Duration) -> Arc<dyn TemperatureProvider> {
        Arc::new(Self {
            name,
            delay,
            reading: Ok(celsius),
        })
    }
}

#[async_trait]
impl TemperatureProvider for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn temperature(&self, _location: &str) -> anyhow::Result<f64> {
        tokio::time::sleep(self.delay).await;
        self.reading.map_err(|msg| anyhow::anyhow!(msg))
    }
}

#[tokio::test]
async fn test_three_providers_mean() {
    let providers = vec![
        Scripted::ok("a", 20.0),
        Scripted::ok("b", 22.0),
        Scripted::ok("c", 24.0),
    ];

    assert_eq!(aggregate(&providers, "Amsterdam").await.unwrap(), 22.0);
}

#[tokio::test]
async fn test_one_failure_fails_the_call_promptly() {
    let providers = vec![
        Scripted::ok("a", 20.0),
        Scripted::err("b", "upstream returned status 500"),
        Scripted::slow("c", 24.0, Duration::from_secs(5)),
    ];

    let started = Instant::now();
    let err = aggregate(&providers, "Amsterdam").await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(err.provider(), Some("b"));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("upstream returned status 500"));
}

#[tokio::test]
async fn test_staggered_readings_all_counted() {
    let providers = vec![
        Scripted::slow("late", 9.0, Duration::from_millis(60)),
        Scripted::slow("mid", 6.0, Duration::from_millis(30)),
        Scripted::ok("early", 3.0),
    ];

    let agg = aggregate_with_policy(&providers, "Vienna", AggregationPolicy::Strict)
        .await
        .unwrap();

    assert_eq!(agg.celsius, 6.0);
    assert_eq!((agg.succeeded, agg.total), (3, 3));
}

#[tokio::test]
async fn test_multi_provider_with_deadline() {
    let multi = MultiProvider::new(vec![
        Scripted::ok("a", 1.0),
        Scripted::slow("b", 2.0, Duration::from_secs(5)),
    ])
    .with_deadline(Duration::from_millis(100));

    let err = multi.aggregate("Dublin").await.unwrap_err();
    assert!(matches!(err, AggregateError::Timeout { .. }));
}

#[tokio::test]
async fn test_partial_coverage_survives_a_hung_provider() {
    let multi = MultiProvider::new(vec![
        Scripted::ok("a", 20.0),
        Scripted::ok("b", 24.0),
        Scripted::slow("hung", 30.0, Duration::from_secs(30)),
    ])
    .with_policy(AggregationPolicy::AtLeast(2))
    .with_deadline(Duration::from_millis(100));

    let agg = multi.aggregate("Paris").await.unwrap();
    assert_eq!(agg.celsius, 22.0);
    assert_eq!((agg.succeeded, agg.total), (2, 3));
}

#[tokio::test]
async fn test_multi_provider_partial_coverage() {
    let multi = MultiProvider::new(vec![
        Scripted::ok("a", 10.0),
        Scripted::err("b", "bad key"),
        Scripted::ok("c", 14.0),
        Scripted::ok("d", 18.0),
    ])
    .with_policy(AggregationPolicy::AtLeast(3));

    let agg = multi.aggregate("Prague").await.unwrap();
    assert_eq!(agg.celsius, 14.0);
    assert_eq!(agg.succeeded, 3);
    assert_eq!(agg.total, 4);
}

#[test]
fn test_config_file_to_provider_set() {
    let path = std::env::temp_dir().join("multi_weather_test_config.json");
    std::fs::write(
        &path,
        r#"{ "weather_underground": { "api_key": "wu" }, "forecast_io": { "enabled": false, "api_key": "fio" } }"#,
    )
    .unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    let providers = config.build_providers().unwrap();
    let names: Vec<_> = providers.iter().map(|p| p.name()).collect();

    assert_eq!(names, ["openweathermap", "weather_underground"]);

    std::fs::remove_file(&path).unwrap();
}
