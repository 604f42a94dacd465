//! Single-model price forecast.
//!
//! The whole table is scaled jointly, every column except the target becomes
//! a feature, and the target's next value after each window is the label.
//! Predictions are mapped back to price units through the target column's
//! fitted bounds.

use crate::check_prediction_count;
use chrono::NaiveDate;
use forecast_core::{
    ForecastConfig, ForecastError, ForecastResult, MapePolicy, MetricsSummary, NamedMetrics,
    NextStepForecast, PredictionRecord, Predictor, RegressionMetrics, TimeSeriesTable,
};
use forecast_evaluation::MetricsCalculator;
use forecast_preprocessing::{
    latest_window, make_windows, ChronologicalSplit, MinMaxScaler, ScalerParams,
};
use ndarray::Axis;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    window_size: usize,
    split_fraction: f64,
    target_column: String,
    scaler_range: (f64, f64),
    mape_policy: MapePolicy,
}

/// Everything one forecast run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub model: String,
    pub target_column: String,
    pub window_size: usize,
    pub train_samples: usize,
    pub eval_samples: usize,
    /// Accuracy on the scaler's normalized values
    pub normalized_metrics: RegressionMetrics,
    /// Accuracy in price units
    pub price_metrics: RegressionMetrics,
    /// In-sample MSE on normalized values
    pub train_mse: f64,
    pub next_step: NextStepForecast,
    pub scaler: ScalerParams,
    /// Evaluation rows in date order; written to CSV rather than JSON
    #[serde(skip)]
    pub records: Vec<PredictionRecord>,
}

impl ForecastPipeline {
    #[must_use]
    pub fn new(window_size: usize, split_fraction: f64, target_column: impl Into<String>) -> Self {
        Self {
            window_size,
            split_fraction,
            target_column: target_column.into(),
            scaler_range: (0.0, 1.0),
            mape_policy: MapePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_scaler_range(mut self, range: (f64, f64)) -> Self {
        self.scaler_range = range;
        self
    }

    #[must_use]
    pub fn with_mape_policy(mut self, policy: MapePolicy) -> Self {
        self.mape_policy = policy;
        self
    }

    #[must_use]
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(
            config.window_size,
            config.split_fraction,
            config.target_column.clone(),
        )
        .with_scaler_range(config.scaler_range)
        .with_mape_policy(config.mape_policy)
    }

    /// Scales, windows, splits, trains `predictor`, and scores it on the
    /// held-out tail of the series.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the table is empty, incomplete, lacks the
    /// target column or any feature column, or if the model misbehaves;
    /// `InvalidParameter` for an unusable window size or split; and
    /// `DivideByZero` for a constant column or a zero price under
    /// [`MapePolicy::Fail`].
    pub fn run(
        &self,
        table: &TimeSeriesTable,
        predictor: &mut dyn Predictor,
    ) -> ForecastResult<ForecastReport> {
        let target_idx = self.validate(table)?;
        let last_observed = table
            .last_date()
            .ok_or_else(|| ForecastError::invalid_input("table has no rows"))?;

        let params = MinMaxScaler::new(self.scaler_range)?.fit(table)?;
        let scaled = params.transform(table.values())?;
        tracing::info!(
            "Scaled {} rows x {} columns into {:?}",
            table.len(),
            table.columns().len(),
            self.scaler_range
        );

        let feature_idx: Vec<usize> = (0..table.columns().len())
            .filter(|&c| c != target_idx)
            .collect();
        let features = scaled.select(Axis(1), &feature_idx);
        let labels = scaled.column(target_idx).to_owned();

        let windows = make_windows(features.view(), labels.view(), self.window_size)?;
        let split = ChronologicalSplit::by_fraction(windows.len(), self.split_fraction)?;
        let (train, eval) = windows.split(&split)?;
        tracing::info!(
            "Built {} windows of {}: {} train, {} eval",
            windows.len(),
            self.window_size,
            train.len(),
            eval.len()
        );

        predictor.fit(train.features(), train.labels())?;
        let train_fit = predictor.predict(train.features())?;
        check_prediction_count(train.len(), train_fit.len())?;
        let eval_fit = predictor.predict(eval.features())?;
        check_prediction_count(eval.len(), eval_fit.len())?;

        let train_mse = MetricsCalculator::mse(train.labels(), train_fit.view())?;
        let normalized_metrics =
            MetricsCalculator::calculate_scaled(eval.labels(), eval_fit.view())?;

        let real = params.inverse_column(&self.target_column, eval.labels())?;
        let predicted = params.inverse_column(&self.target_column, eval_fit.view())?;
        let price_metrics =
            MetricsCalculator::calculate(real.view(), predicted.view(), self.mape_policy)?;

        let records: Vec<PredictionRecord> = eval
            .label_rows()
            .iter()
            .zip(real.iter().zip(predicted.iter()))
            .map(|(&row, (&real_price, &predicted_price))| PredictionRecord {
                date: table.dates()[row],
                real_price,
                predicted_price,
            })
            .collect();

        let latest = latest_window(features.view(), self.window_size)?;
        let next_fit = predictor.predict(latest.view())?;
        check_prediction_count(1, next_fit.len())?;
        let next_price = params.inverse_column(&self.target_column, next_fit.view())?;
        let next_step = NextStepForecast {
            last_observed,
            predicted_price: next_price[0],
        };

        tracing::info!(
            "{}: price MAE {:.4}, RMSE {:.4}, MAPE {:.2}%",
            predictor.name(),
            price_metrics.mae,
            price_metrics.rmse,
            price_metrics.mape * 100.0
        );

        Ok(ForecastReport {
            model: predictor.name().to_string(),
            target_column: self.target_column.clone(),
            window_size: self.window_size,
            train_samples: train.len(),
            eval_samples: eval.len(),
            normalized_metrics,
            price_metrics,
            train_mse,
            next_step,
            scaler: params,
            records,
        })
    }

    fn validate(&self, table: &TimeSeriesTable) -> ForecastResult<usize> {
        if table.is_empty() {
            return Err(ForecastError::invalid_input("input table has no rows"));
        }
        let target_idx = table.column_index(&self.target_column).ok_or_else(|| {
            ForecastError::invalid_input(format!(
                "target column '{}' not found (available: {})",
                self.target_column,
                table.columns().join(", ")
            ))
        })?;
        if table.columns().len() < 2 {
            return Err(ForecastError::invalid_input(format!(
                "no feature columns besides target '{}'",
                self.target_column
            )));
        }
        table.ensure_complete()?;
        Ok(target_idx)
    }
}

impl ForecastReport {
    #[must_use]
    pub fn evaluation_period(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.records.first()?.date, self.records.last()?.date))
    }

    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            title: "Price Forecast".to_string(),
            model: self.model.clone(),
            evaluation_period: self.evaluation_period(),
            train_samples: self.train_samples,
            eval_samples: self.eval_samples,
            metrics: vec![
                NamedMetrics::new("price", self.price_metrics),
                NamedMetrics::new("normalized", self.normalized_metrics),
            ],
            diagnostics: vec![
                ("Target".to_string(), self.target_column.clone()),
                ("Window Size".to_string(), self.window_size.to_string()),
                ("Train MSE".to_string(), format!("{:.6}", self.train_mse)),
            ],
            next_step: Some(self.next_step.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use forecast_models::LinearRegression;
    use ndarray::{Array1, Array2, ArrayView1, ArrayView3};

    #[allow(clippy::cast_precision_loss)]
    fn table(rows: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates = (0..rows).map(|i| start + Duration::days(i as i64)).collect();
        // the price follows the lagged driver exactly
        let values = Array2::from_shape_fn((rows, 2), |(r, c)| {
            let driver = |r: usize| 50.0 + 10.0 * (r as f64 * 0.2).sin() + r as f64 * 0.1;
            if c == 0 {
                driver(r)
            } else if r == 0 {
                driver(0)
            } else {
                driver(r - 1) * 2.0
            }
        });
        TimeSeriesTable::new(dates, vec!["Driver".into(), "Adj Close".into()], values).unwrap()
    }

    /// Returns one value too few.
    struct ShortPredictor;

    impl Predictor for ShortPredictor {
        fn fit(&mut self, _: ArrayView3<'_, f64>, _: ArrayView1<'_, f64>) -> ForecastResult<()> {
            Ok(())
        }

        fn predict(&self, features: ArrayView3<'_, f64>) -> ForecastResult<Array1<f64>> {
            Ok(Array1::zeros(features.len_of(Axis(0)).saturating_sub(1)))
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[test]
    fn learns_lagged_relationship() {
        let table = table(120);
        let pipeline = ForecastPipeline::new(5, 0.8, "Adj Close");
        let mut model = LinearRegression::new().with_ridge(1e-6);

        let report = pipeline.run(&table, &mut model).unwrap();

        assert_eq!(report.train_samples + report.eval_samples, 115);
        assert_eq!(report.train_samples, 92);
        assert_eq!(report.records.len(), report.eval_samples);
        assert!(report.price_metrics.mape < 0.01, "{:?}", report.price_metrics);
        assert!(report.price_metrics.rmse >= report.price_metrics.mae);
        assert_eq!(report.next_step.last_observed, *table.dates().last().unwrap());
        assert_eq!(report.model, "linear-regression");
    }

    #[test]
    fn evaluation_dates_follow_training_dates() {
        let table = table(60);
        let pipeline = ForecastPipeline::new(4, 0.75, "Adj Close");
        let mut model = LinearRegression::new().with_ridge(1e-6);

        let report = pipeline.run(&table, &mut model).unwrap();

        // last training label sits at row window_size + train_samples - 1
        let last_train = table.dates()[4 + report.train_samples - 1];
        assert!(report.records.iter().all(|r| r.date > last_train));
        assert!(report.records.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(report.records.last().unwrap().date, *table.dates().last().unwrap());
    }

    #[test]
    fn real_prices_are_restored_from_scaled_labels() {
        let table = table(40);
        let pipeline = ForecastPipeline::new(3, 0.5, "Adj Close");
        let mut model = LinearRegression::new().with_ridge(1e-6);

        let report = pipeline.run(&table, &mut model).unwrap();

        let prices = table.column("Adj Close").unwrap();
        let first_eval_row = 3 + report.train_samples;
        for (i, record) in report.records.iter().enumerate() {
            assert!((record.real_price - prices[first_eval_row + i]).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_missing_target_and_short_predictions() {
        let table = table(40);

        let missing = ForecastPipeline::new(3, 0.8, "Close");
        assert!(matches!(
            missing.run(&table, &mut LinearRegression::new()),
            Err(ForecastError::InvalidInput(_))
        ));

        let pipeline = ForecastPipeline::new(3, 0.8, "Adj Close");
        assert!(matches!(
            pipeline.run(&table, &mut ShortPredictor),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn window_larger_than_history_is_a_parameter_error() {
        let table = table(10);
        let pipeline = ForecastPipeline::new(10, 0.8, "Adj Close");
        assert!(matches!(
            pipeline.run(&table, &mut LinearRegression::new()),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn evaluation_on_series_low_still_scores() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates = (0..10).map(|i| start + Duration::days(i)).collect();
        let prices = [20.0, 22.0, 21.0, 25.0, 24.0, 23.0, 26.0, 27.0, 22.0, 10.0];
        #[allow(clippy::cast_precision_loss)]
        let values = Array2::from_shape_fn((10, 2), |(r, c)| {
            if c == 0 {
                r as f64 + 1.0
            } else {
                prices[r]
            }
        });
        let table =
            TimeSeriesTable::new(dates, vec!["Driver".into(), "Adj Close".into()], values)
                .unwrap();

        let report = ForecastPipeline::new(1, 0.9, "Adj Close")
            .run(&table, &mut LinearRegression::new().with_ridge(1e-6))
            .unwrap();

        // the only evaluation label scales to 0
        assert_eq!(report.eval_samples, 1);
        assert!(report.normalized_metrics.mape.is_nan());
        assert!(report.price_metrics.mape.is_finite());
        assert!((report.records[0].real_price - 10.0).abs() < 1e-9);
    }

    #[test]
    fn summary_lists_price_metrics_first() {
        let table = table(60);
        let pipeline = ForecastPipeline::new(4, 0.8, "Adj Close");
        let report = pipeline
            .run(&table, &mut LinearRegression::new().with_ridge(1e-6))
            .unwrap();

        let summary = report.summary();
        assert_eq!(summary.metrics[0].name, "price");
        assert_eq!(summary.eval_samples, report.eval_samples);
        assert!(summary.evaluation_period.is_some());
    }
}
