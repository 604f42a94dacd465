//! stack CLI command.
//!
//! Joins upstream forecast results on date, fits the linear meta-model,
//! validates it, and writes the blended predictions.

use anyhow::{Context, Result};
use clap::Args;
use forecast_core::{MapePolicy, MetricsFormatter, StackingConfig};
use forecast_data::{load_base_results, CsvStorage, JsonStorage};
use forecast_models::LinearRegression;
use forecast_pipeline::StackingPipeline;
use std::path::PathBuf;

use super::load_config;

/// Arguments for the stack command.
#[derive(Args, Debug, Clone)]
pub struct StackArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Profile overlay read from `<config stem>.<profile>.toml`
    #[arg(long)]
    pub profile: Option<String>,

    /// Share of rows used for training, strictly between 0 and 1
    #[arg(long)]
    pub split_fraction: Option<f64>,

    /// Walk-forward cross-validation folds
    #[arg(long)]
    pub folds: Option<usize>,

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

impl StackArgs {
    fn apply(&self, config: &mut StackingConfig) {
        if let Some(fraction) = self.split_fraction {
            config.split_fraction = fraction;
        }
        if let Some(folds) = self.folds {
            config.folds = folds;
        }
        if let Some(policy) = self.mape_policy {
            config.mape_policy = policy;
        }
        if let Some(output) = &self.output {
            config.output.clone_from(output);
        }
    }
}

/// Runs the stack command.
///
/// # Errors
/// Returns an error if configuration is invalid, a base result fails to
/// load, the pipeline fails, or results cannot be written.
pub fn run_stack(args: &StackArgs) -> Result<()> {
    let mut config = load_config(&args.config, args.profile.as_deref())?.stacking;
    args.apply(&mut config);
    config.validate().context("Invalid stacking configuration")?;

    let names: Vec<&str> = config.base_results.iter().map(|b| b.name.as_str()).collect();
    tracing::info!("Stacking base results: {}", names.join(", "));

    let table = load_base_results(&config.base_results, &config.date_column)?;

    let ridge = config.ridge;
    let report = StackingPipeline::from_config(&config)
        .run(&table, || LinearRegression::new().with_ridge(ridge))
        .context("Stacking run failed")?;

    CsvStorage::write_stacking(&config.output, &report.base_names, &report.records)?;
    tracing::info!(
        "Wrote {} stacked predictions to {}",
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
