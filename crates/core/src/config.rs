use crate::error::{ForecastError, ForecastResult};
use crate::table::ColumnSelection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub forecast: ForecastConfig,
    pub stacking: StackingConfig,
}

/// How MAPE treats a real value of exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapePolicy {
    /// Raise `DivideByZero` (default)
    #[default]
    Fail,
    /// Leave zero-valued reals out of the average
    Skip,
}

impl std::str::FromStr for MapePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "fail" | "error" => Ok(Self::Fail),
            "skip" | "ignore" => Ok(Self::Skip),
            _ => Err(anyhow::anyhow!(
                "Invalid MAPE policy: '{}'. Valid values: fail, skip",
                s
            )),
        }
    }
}

impl std::fmt::Display for MapePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// One delimited input source for the price forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Columns to keep by header name
    #[serde(default)]
    pub columns: Vec<String>,
    /// Columns to keep by header position, used when `columns` is empty
    #[serde(default)]
    pub column_indices: Vec<usize>,
}

impl SourceConfig {
    #[must_use]
    pub fn selection(&self) -> ColumnSelection {
        if !self.columns.is_empty() {
            ColumnSelection::Names(self.columns.clone())
        } else if !self.column_indices.is_empty() {
            ColumnSelection::Indices(self.column_indices.clone())
        } else {
            ColumnSelection::All
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub window_size: usize,
    pub split_fraction: f64,
    pub scaler_range: (f64, f64),
    pub target_column: String,
    pub date_column: String,
    pub mape_policy: MapePolicy,
    /// L2 penalty for the linear window regressor
    pub ridge: f64,
    pub sources: Vec<SourceConfig>,
    pub output: PathBuf,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            split_fraction: 0.8,
            scaler_range: (0.0, 1.0),
            target_column: "Adj Close".to_string(),
            date_column: "Date".to_string(),
            mape_policy: MapePolicy::Fail,
            ridge: 1e-6,
            sources: Vec::new(),
            output: PathBuf::from("output/forecast_result.csv"),
        }
    }
}

impl ForecastConfig {
    /// Checks every literal that shapes the run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` describing the first bad value.
    pub fn validate(&self) -> ForecastResult<()> {
        if self.window_size == 0 {
            return Err(ForecastError::invalid_parameter(
                "window_size must be at least 1",
            ));
        }
        validate_split_fraction(self.split_fraction)?;
        validate_scaler_range(self.scaler_range)?;
        validate_ridge(self.ridge)?;
        if self.target_column.is_empty() {
            return Err(ForecastError::invalid_parameter(
                "target_column must not be empty",
            ));
        }
        if self.sources.is_empty() {
            return Err(ForecastError::invalid_parameter(
                "at least one source must be configured",
            ));
        }
        Ok(())
    }
}

/// An upstream forecast result file feeding the meta-model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResultConfig {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    pub split_fraction: f64,
    pub scaler_range: (f64, f64),
    pub date_column: String,
    pub mape_policy: MapePolicy,
    pub ridge: f64,
    /// Walk-forward cross-validation folds
    pub folds: usize,
    /// Points on the learning curve
    pub learning_curve_steps: usize,
    pub base_results: Vec<BaseResultConfig>,
    pub output: PathBuf,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            split_fraction: 0.8,
            scaler_range: (0.0, 1.0),
            date_column: "Date".to_string(),
            mape_policy: MapePolicy::Fail,
            ridge: 1e-6,
            folds: 5,
            learning_curve_steps: 10,
            base_results: Vec::new(),
            output: PathBuf::from("output/stacking_result.csv"),
        }
    }
}

impl StackingConfig {
    /// Checks every literal that shapes the run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` describing the first bad value.
    pub fn validate(&self) -> ForecastResult<()> {
        validate_split_fraction(self.split_fraction)?;
        validate_scaler_range(self.scaler_range)?;
        validate_ridge(self.ridge)?;
        // learning-curve prefixes can hold a single row
        if self.ridge <= 0.0 {
            return Err(ForecastError::invalid_parameter(format!(
                "stacking ridge must be positive, got {}",
                self.ridge
            )));
        }
        if self.folds < 2 {
            return Err(ForecastError::invalid_parameter(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        if self.learning_curve_steps == 0 {
            return Err(ForecastError::invalid_parameter(
                "learning_curve_steps must be at least 1",
            ));
        }
        if self.base_results.len() < 2 {
            return Err(ForecastError::invalid_parameter(format!(
                "stacking needs at least 2 base results, got {}",
                self.base_results.len()
            )));
        }
        let mut names: Vec<&str> = self.base_results.iter().map(|b| b.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ForecastError::invalid_parameter(
                "base result names must be unique",
            ));
        }
        if names.iter().any(|n| n.is_empty() || *n == crate::records::REAL_PRICE_COLUMN) {
            return Err(ForecastError::invalid_parameter(
                "base result names must be non-empty and differ from 'Real Price'",
            ));
        }
        Ok(())
    }
}

fn validate_split_fraction(fraction: f64) -> ForecastResult<()> {
    if fraction.is_finite() && fraction > 0.0 && fraction < 1.0 {
        Ok(())
    } else {
        Err(ForecastError::invalid_parameter(format!(
            "split_fraction must lie strictly between 0 and 1, got {fraction}"
        )))
    }
}

fn validate_scaler_range((lo, hi): (f64, f64)) -> ForecastResult<()> {
    if lo.is_finite() && hi.is_finite() && lo < hi {
        Ok(())
    } else {
        Err(ForecastError::invalid_parameter(format!(
            "scaler_range must be finite with min < max, got ({lo}, {hi})"
        )))
    }
}

fn validate_ridge(ridge: f64) -> ForecastResult<()> {
    if ridge.is_finite() && ridge >= 0.0 {
        Ok(())
    } else {
        Err(ForecastError::invalid_parameter(format!(
            "ridge must be a non-negative number, got {ridge}"
        )))
    }
}
