//! CLI commands for the price-forecast workspace.

pub mod forecast;
pub mod stack;

pub use forecast::{run_forecast, ForecastArgs};
pub use stack::{run_stack, StackArgs};

use anyhow::{Context, Result};
use forecast_core::{AppConfig, ConfigLoader};
use std::path::Path;

/// Loads the layered configuration, with an optional profile overlay.
fn load_config(path: &Path, profile: Option<&str>) -> Result<AppConfig> {
    if !path.exists() {
        tracing::warn!(
            "Config file {} not found; using defaults and environment",
            path.display()
        );
    }
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile),
        None => ConfigLoader::load(path),
    };
    config.with_context(|| format!("Failed to load configuration from {}", path.display()))
}
