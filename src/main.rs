//! CLI entry point for multi_weather.
//!
//! Provides subcommands for querying the mean temperature of a city across
//! every configured provider, resolving a city's coordinates, and listing the
//! configured providers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use multi_weather::aggregator::{AggregationPolicy, MultiProvider};
use multi_weather::config::Config;
use multi_weather::output::{CoordinatesReport, WeatherReport, print_json};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "multi_weather")]
#[command(about = "Mean temperature of a city across several weather APIs", long_about = None)]
struct Cli {
    /// JSON config file; provider keys are read from the environment when omitted
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query every provider and print the mean temperature in Celsius
    Weather {
        /// City name, e.g. "London" or "San Francisco"
        city: String,

        /// Accept a mean from at least this many providers instead of requiring all
        #[arg(short, long)]
        min_successes: Option<usize>,
    },
    /// Resolve a city's coordinates through OpenWeatherMap
    Coordinates {
        city: String,
    },
    /// List the providers that would be queried
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/multi_weather.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("multi_weather.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Weather {
            city,
            min_successes,
        } => {
            let policy = min_successes.map_or(AggregationPolicy::Strict, AggregationPolicy::AtLeast);
            weather(&config, &city, policy).await?;
        }
        Commands::Coordinates { city } => {
            let coord = config.openweathermap()?.coordinates(&city).await?;
            print_json(&CoordinatesReport { city, coord })?;
        }
        Commands::Providers => {
            let providers = config.build_providers()?;
            info!(total = providers.len(), "Configured providers");
            for provider in &providers {
                println!("{}", provider.name());
            }
        }
    }

    Ok(())
}

/// Aggregates the temperature of `city` and prints the report.
#[tracing::instrument(skip(config))]
async fn weather(config: &Config, city: &str, policy: AggregationPolicy) -> Result<()> {
    let multi = MultiProvider::new(config.build_providers()?)
        .with_policy(policy)
        .with_deadline(config.timeout());
    let names = multi.providers().map(|p| p.name().to_string()).collect();

    let begin = Instant::now();
    match multi.aggregate(city).await {
        Ok(aggregation) => {
            info!(
                celsius = aggregation.celsius,
                succeeded = aggregation.succeeded,
                total = aggregation.total,
                "Aggregation succeeded"
            );
            print_json(&WeatherReport::new(city, aggregation, names, begin.elapsed()))
        }
        Err(e) => {
            let e = anyhow::Error::from(e);
            error!(error = %format_args!("{e:#}"), "Aggregation failed");
            Err(e)
        }
    }
}
