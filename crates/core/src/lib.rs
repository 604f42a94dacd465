//! Core types, traits, configuration and errors for the price-forecast workspace.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod metrics_formatter;
pub mod records;
pub mod table;
pub mod traits;

pub use config::{
    AppConfig, BaseResultConfig, ForecastConfig, MapePolicy, SourceConfig, StackingConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{ForecastError, ForecastResult};
pub use metrics_formatter::{MetricsFormatter, MetricsSummary};
pub use records::{
    NamedMetrics, NextStepForecast, PredictionRecord, RegressionMetrics, StackingRecord,
    DATE_COLUMN, META_PREDICTED_PRICE_COLUMN, PREDICTED_PRICE_COLUMN, REAL_PRICE_COLUMN,
};
pub use table::{ColumnSelection, TimeSeriesTable};
pub use traits::Predictor;
