//! Stacked meta-model over upstream forecast results.
//!
//! The input table holds the real price plus one column of predictions per
//! base model, all on the same dates. A meta-model learns to blend the base
//! predictions into the real price. Each row is its own one-step window, and
//! the split stays chronological so the meta-model is scored on later dates
//! than it was fitted on.

use crate::check_prediction_count;
use chrono::NaiveDate;
use forecast_core::{
    ForecastError, ForecastResult, MapePolicy, MetricsSummary, NamedMetrics, Predictor,
    RegressionMetrics, StackingConfig, StackingRecord, TimeSeriesTable, REAL_PRICE_COLUMN,
};
use forecast_evaluation::{
    learning_curve, walk_forward_mse, CrossValidationReport, LearningCurvePoint,
    MetricsCalculator,
};
use forecast_preprocessing::{pointwise, ChronologicalSplit, MinMaxScaler};
use ndarray::Axis;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct StackingPipeline {
    split_fraction: f64,
    scaler_range: (f64, f64),
    mape_policy: MapePolicy,
    folds: usize,
    learning_curve_steps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StackingReport {
    pub model: String,
    pub base_names: Vec<String>,
    pub train_samples: usize,
    pub eval_samples: usize,
    /// Meta-model accuracy in price units
    pub meta_metrics: RegressionMetrics,
    /// Each base model's own accuracy over the same evaluation rows
    pub base_metrics: Vec<NamedMetrics>,
    /// In-sample MSE on normalized values
    pub train_mse: f64,
    /// Held-out MSE on normalized values
    pub validation_mse: f64,
    pub cross_validation: CrossValidationReport,
    pub learning_curve: Vec<LearningCurvePoint>,
    #[serde(skip)]
    pub records: Vec<StackingRecord>,
}

impl StackingPipeline {
    #[must_use]
    pub fn new(split_fraction: f64) -> Self {
        Self {
            split_fraction,
            scaler_range: (0.0, 1.0),
            mape_policy: MapePolicy::default(),
            folds: 5,
            learning_curve_steps: 10,
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
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    #[must_use]
    pub fn with_learning_curve_steps(mut self, steps: usize) -> Self {
        self.learning_curve_steps = steps;
        self
    }

    #[must_use]
    pub fn from_config(config: &StackingConfig) -> Self {
        Self::new(config.split_fraction)
            .with_scaler_range(config.scaler_range)
            .with_mape_policy(config.mape_policy)
            .with_folds(config.folds)
            .with_learning_curve_steps(config.learning_curve_steps)
    }

    /// Fits a meta-model from `factory` on the training rows and scores it
    /// against the real price and against every base model.
    ///
    /// `factory` is also used to build the fresh models that walk-forward
    /// validation and the learning curve need.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the table is empty, incomplete, lacks the
    /// real-price column or any base column; `InvalidParameter` for an
    /// unusable split, fold count or curve size; `DivideByZero` for a constant
    /// column or a zero price under [`MapePolicy::Fail`]; and any model error.
    pub fn run<P, F>(
        &self,
        table: &TimeSeriesTable,
        mut factory: F,
    ) -> ForecastResult<StackingReport>
    where
        P: Predictor,
        F: FnMut() -> P,
    {
        let real_idx = Self::validate(table)?;

        let params = MinMaxScaler::new(self.scaler_range)?.fit(table)?;
        let scaled = params.transform(table.values())?;

        let base_idx: Vec<usize> = (0..table.columns().len())
            .filter(|&c| c != real_idx)
            .collect();
        let base_names: Vec<String> = base_idx
            .iter()
            .map(|&c| table.columns()[c].clone())
            .collect();
        let features = scaled.select(Axis(1), &base_idx);
        let labels = scaled.column(real_idx).to_owned();

        let windows = pointwise(features.view(), labels.view())?;
        let split = ChronologicalSplit::by_fraction(windows.len(), self.split_fraction)?;
        let (train, eval) = windows.split(&split)?;
        tracing::info!(
            "Stacking {} base model(s) over {} rows: {} train, {} eval",
            base_names.len(),
            windows.len(),
            train.len(),
            eval.len()
        );

        let mut meta = factory();
        meta.fit(train.features(), train.labels())?;
        let train_fit = meta.predict(train.features())?;
        check_prediction_count(train.len(), train_fit.len())?;
        let eval_fit = meta.predict(eval.features())?;
        check_prediction_count(eval.len(), eval_fit.len())?;

        let train_mse = MetricsCalculator::mse(train.labels(), train_fit.view())?;
        let validation_mse = MetricsCalculator::mse(eval.labels(), eval_fit.view())?;

        // Restore every evaluation column to price units in one pass.
        let eval_scaled = scaled.select(Axis(0), eval.label_rows());
        let eval_prices = params.inverse_transform(eval_scaled.view())?;
        let real = eval_prices.column(real_idx).to_owned();
        let meta_prices = params.inverse_column(REAL_PRICE_COLUMN, eval_fit.view())?;

        let meta_metrics =
            MetricsCalculator::calculate(real.view(), meta_prices.view(), self.mape_policy)?;
        let mut base_metrics = Vec::with_capacity(base_idx.len());
        for (name, &c) in base_names.iter().zip(&base_idx) {
            let metrics = MetricsCalculator::calculate(
                real.view(),
                eval_prices.column(c),
                self.mape_policy,
            )?;
            base_metrics.push(NamedMetrics::new(name.clone(), metrics));
        }

        let cross_validation = walk_forward_mse(&mut factory, &windows, self.folds)?;
        let curve = learning_curve(&mut factory, &train, &eval, self.learning_curve_steps)?;

        let records: Vec<StackingRecord> = eval
            .label_rows()
            .iter()
            .enumerate()
            .map(|(i, &row)| StackingRecord {
                date: table.dates()[row],
                real_price: real[i],
                meta_price: meta_prices[i],
                base_prices: base_idx.iter().map(|&c| eval_prices[[i, c]]).collect(),
            })
            .collect();

        tracing::info!(
            "{}: meta MAE {:.4}, validation MSE {:.6}, CV MSE {:.6}",
            meta.name(),
            meta_metrics.mae,
            validation_mse,
            cross_validation.mean_mse
        );

        Ok(StackingReport {
            model: meta.name().to_string(),
            base_names,
            train_samples: train.len(),
            eval_samples: eval.len(),
            meta_metrics,
            base_metrics,
            train_mse,
            validation_mse,
            cross_validation,
            learning_curve: curve,
            records,
        })
    }

    fn validate(table: &TimeSeriesTable) -> ForecastResult<usize> {
        if table.is_empty() {
            return Err(ForecastError::invalid_input("stacking table has no rows"));
        }
        let real_idx = table.column_index(REAL_PRICE_COLUMN).ok_or_else(|| {
            ForecastError::invalid_input(format!(
                "stacking table lacks a '{REAL_PRICE_COLUMN}' column"
            ))
        })?;
        if table.columns().len() < 2 {
            return Err(ForecastError::invalid_input(
                "stacking needs at least one base prediction column",
            ));
        }
        table.ensure_complete()?;
        Ok(real_idx)
    }
}

impl StackingReport {
    #[must_use]
    pub fn evaluation_period(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.records.first()?.date, self.records.last()?.date))
    }

    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let mut metrics = vec![NamedMetrics::new("meta", self.meta_metrics)];
        metrics.extend(self.base_metrics.iter().cloned());

        let mut diagnostics = vec![
            ("Base Models".to_string(), self.base_names.join(", ")),
            ("Train MSE".to_string(), format!("{:.6}", self.train_mse)),
            (
                "Validation MSE".to_string(),
                format!("{:.6}", self.validation_mse),
            ),
            (
                "CV MSE".to_string(),
                format!(
                    "{:.6} over {} folds",
                    self.cross_validation.mean_mse,
                    self.cross_validation.folds.len()
                ),
            ),
            (
                "CV Gap".to_string(),
                format!("{:.6}", self.cross_validation.generalization_gap()),
            ),
        ];
        if let Some(point) = self.learning_curve.last() {
            diagnostics.push((
                "Curve @ Full Train".to_string(),
                format!(
                    "train {:.6} / validation {:.6}",
                    point.train_mse, point.validation_mse
                ),
            ));
        }

        MetricsSummary {
            title: "Stacking Meta-Model".to_string(),
            model: self.model.clone(),
            evaluation_period: self.evaluation_period(),
            train_samples: self.train_samples,
            eval_samples: self.eval_samples,
            metrics,
            diagnostics,
            next_step: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use forecast_models::LinearRegression;
    use ndarray::Array2;

    /// Real price plus two base models whose average is exact.
    #[allow(clippy::cast_precision_loss)]
    fn table(rows: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2023, 2, 14).unwrap();
        let dates = (0..rows).map(|i| start + Duration::days(i as i64)).collect();
        let values = Array2::from_shape_fn((rows, 3), |(r, c)| {
            let real = 100.0 + 5.0 * (r as f64 * 0.3).sin() + r as f64 * 0.2;
            let wobble = 2.0 * (r as f64 * 1.3).cos();
            match c {
                0 => real,
                1 => real + wobble,
                _ => real - wobble,
            }
        });
        TimeSeriesTable::new(
            dates,
            vec![REAL_PRICE_COLUMN.into(), "stock".into(), "fs".into()],
            values,
        )
        .unwrap()
    }

    fn pipeline() -> StackingPipeline {
        StackingPipeline::new(0.8).with_folds(3).with_learning_curve_steps(5)
    }

    #[test]
    fn meta_model_beats_each_base() {
        let table = table(100);
        let report = pipeline()
            .run(&table, || LinearRegression::new().with_ridge(1e-6))
            .unwrap();

        assert_eq!(report.train_samples, 80);
        assert_eq!(report.eval_samples, 20);
        assert_eq!(report.base_names, vec!["stock".to_string(), "fs".to_string()]);
        for base in &report.base_metrics {
            assert!(report.meta_metrics.mae < base.metrics.mae, "{}", base.name);
        }
        assert!(report.meta_metrics.mae < 1e-3);
        assert_eq!(report.cross_validation.folds.len(), 3);
        assert_eq!(report.learning_curve.len(), 5);
    }

    #[test]
    fn records_restore_prices_and_stay_after_training() {
        let table = table(50);
        let report = pipeline()
            .run(&table, || LinearRegression::new().with_ridge(1e-6))
            .unwrap();

        let last_train = table.dates()[report.train_samples - 1];
        let stock = table.column("stock").unwrap();
        for (i, record) in report.records.iter().enumerate() {
            assert!(record.date > last_train);
            assert_eq!(record.base_prices.len(), 2);
            let row = report.train_samples + i;
            assert!((record.base_prices[0] - stock[row]).abs() < 1e-9);
        }
    }

    #[test]
    fn requires_real_price_and_a_base() {
        let table = table(30);
        let only_real = table.select(&[REAL_PRICE_COLUMN]).unwrap();
        assert!(matches!(
            pipeline().run(&only_real, LinearRegression::new),
            Err(ForecastError::InvalidInput(_))
        ));

        let no_real = table.select(&["stock", "fs"]).unwrap();
        assert!(matches!(
            pipeline().run(&no_real, LinearRegression::new),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn summary_puts_meta_first() {
        let report = pipeline()
            .run(&table(60), || LinearRegression::new().with_ridge(1e-6))
            .unwrap();
        let summary = report.summary();

        assert_eq!(summary.metrics.len(), 3);
        assert_eq!(summary.metrics[0].name, "meta");
        assert!(summary.next_step.is_none());
        assert!(summary.diagnostics.iter().any(|(label, _)| label == "CV MSE"));
        let gap = summary
            .diagnostics
            .iter()
            .find(|(label, _)| label == "CV Gap")
            .map(|(_, value)| value.clone());
        assert_eq!(
            gap,
            Some(format!("{:.6}", report.cross_validation.generalization_gap()))
        );
    }
}
