use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_COLUMN: &str = "Date";
pub const REAL_PRICE_COLUMN: &str = "Real Price";
pub const PREDICTED_PRICE_COLUMN: &str = "Predicted Price";
pub const META_PREDICTED_PRICE_COLUMN: &str = "Meta Predicted Price";

/// One evaluation-window outcome in price units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Real Price")]
    pub real_price: f64,
    #[serde(rename = "Predicted Price")]
    pub predicted_price: f64,
}

/// One stacked evaluation row: the real price, the meta-model's blend, and
/// each base model's own prediction in base-model order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingRecord {
    pub date: NaiveDate,
    pub real_price: f64,
    pub meta_price: f64,
    pub base_prices: Vec<f64>,
}

/// Forecast for the step after the last observed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStepForecast {
    /// Date of the last row the forecast was made from.
    pub last_observed: NaiveDate,
    pub predicted_price: f64,
}

/// Point-forecast accuracy over paired real/predicted vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Mean squared error
    pub mse: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error as a fraction (0.075 = 7.5%)
    pub mape: f64,
    /// Number of pairs the metrics were computed over
    pub samples: usize,
}

/// Metrics labelled with the model they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMetrics {
    pub name: String,
    pub metrics: RegressionMetrics,
}

impl NamedMetrics {
    #[must_use]
    pub fn new(name: impl Into<String>, metrics: RegressionMetrics) -> Self {
        Self {
            name: name.into(),
            metrics,
        }
    }
}
