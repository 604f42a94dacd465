//! forecast CLI command.
//!
//! Loads and merges the configured sources, trains the linear window
//! regressor, writes the evaluation rows to CSV and prints a report.

use anyhow::{Context, Result};
use clap::Args;
use forecast_core::{ForecastConfig, MapePolicy, MetricsFormatter};
use forecast_data::{load_sources, CsvStorage, JsonStorage};
use forecast_models::LinearRegression;
use forecast_pipeline::ForecastPipeline;
use std::path::PathBuf;

use super::load_config;

/// Arguments for the forecast command.
#[derive(Args, Debug, Clone)]
pub struct ForecastArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Profile overlay read from `<config stem>.<profile>.toml`
    #[arg(long)]
    pub profile: Option<String>,

    /// Past rows per window
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Share of windows used for training, strictly between 0 and 1
    #[arg(long)]
    pub split_fraction: Option<f64>,

    /// Zero-price handling for MAPE: fail or skip
    #[arg(long)]
    pub mape_policy: Option<MapePolicy>,

    /// Result CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the run report as JSON
    #[arg(long)]
    pub metrics_json: Option<PathBuf>,
}

impl ForecastArgs {
    fn apply(&self, config: &mut ForecastConfig) {
        if let Some(window_size) = self.window_size {
            config.window_size = window_size;
        }
        if let Some(fraction) = self.split_fraction {
            config.split_fraction = fraction;
        }
        if let Some(policy) = self.mape_policy {
            config.mape_policy = policy;
        }
        if let Some(output) = &self.output {
            config.output.clone_from(output);
        }
    }
}

/// Runs the forecast command.
///
/// # Errors
/// Returns an error if configuration is invalid, a source fails to load, the
/// pipeline fails, or results cannot be written.
pub fn run_forecast(args: &ForecastArgs) -> Result<()> {
    let mut config = load_config(&args.config, args.profile.as_deref())?.forecast;
    args.apply(&mut config);
    config.validate().context("Invalid forecast configuration")?;

    tracing::info!(
        "Forecasting '{}' from {} source(s), window {}, split {}",
        config.target_column,
        config.sources.len(),
        config.window_size,
        config.split_fraction
    );

    let table = load_sources(&config.sources, &config.date_column)?;

    let mut model = LinearRegression::new().with_ridge(config.ridge);
    let report = ForecastPipeline::from_config(&config)
        .run(&table, &mut model)
        .context("Forecast run failed")?;

    CsvStorage::write_predictions(&config.output, &report.records)?;
    tracing::info!(
        "Wrote {} predictions to {}",
        report.records.len(),
        config.output.display()
    );

    if let Some(path) = &args.metrics_json {
        JsonStorage::write(path, &report)?;
        tracing::info!("Wrote metrics to {}", path.display());
    }

    println!("{}", MetricsFormatter::format(&report.summary()));
    Ok(())
}
