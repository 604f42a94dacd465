//! Walk-forward cross-validation over ordered windows.
//!
//! The samples are cut into `folds + 1` contiguous blocks. Fold `k` trains on
//! everything before block `k + 1` (an expanding window) and scores the
//! block itself, so no fold ever sees data from after the rows it is tested
//! on. Any remainder from uneven division goes to the first training block.

use crate::metrics::MetricsCalculator;
use forecast_core::{ForecastError, ForecastResult, Predictor};
use forecast_preprocessing::WindowSet;
use serde::{Deserialize, Serialize};

/// Scores for one walk-forward fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    /// 1-based fold number
    pub fold: usize,
    /// Training covers windows `[0, train_len)`
    pub train_len: usize,
    /// Evaluation covers windows `[train_len, train_len + eval_len)`
    pub eval_len: usize,
    pub train_mse: f64,
    pub eval_mse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldResult>,
    /// Mean of the per-fold evaluation MSE
    pub mean_mse: f64,
}

impl CrossValidationReport {
    /// Mean evaluation MSE minus mean training MSE. Large positive values
    /// point at overfitting.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn generalization_gap(&self) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        let train_mean =
            self.folds.iter().map(|f| f.train_mse).sum::<f64>() / self.folds.len() as f64;
        self.mean_mse - train_mean
    }
}

/// Runs walk-forward cross-validation, building a fresh model per fold.
///
/// # Errors
///
/// Returns `InvalidParameter` if `folds < 2` or there are too few windows
/// for every block to hold at least one, and propagates model errors.
#[allow(clippy::cast_precision_loss)]
pub fn walk_forward_mse<P, F>(
    mut factory: F,
    windows: &WindowSet,
    folds: usize,
) -> ForecastResult<CrossValidationReport>
where
    P: Predictor,
    F: FnMut() -> P,
{
    if folds < 2 {
        return Err(ForecastError::invalid_parameter(format!(
            "walk-forward validation needs at least 2 folds, got {folds}"
        )));
    }
    let total = windows.len();
    let block = total / (folds + 1);
    if block == 0 {
        return Err(ForecastError::invalid_parameter(format!(
            "{total} windows cannot fill {} walk-forward blocks",
            folds + 1
        )));
    }
    let first_train = total - folds * block;

    let mut results = Vec::with_capacity(folds);
    for k in 0..folds {
        let train_len = first_train + k * block;
        let train = windows.slice(0..train_len);
        let eval = windows.slice(train_len..train_len + block);

        let mut model = factory();
        model.fit(train.features(), train.labels())?;

        let train_fit = model.predict(train.features())?;
        let eval_fit = model.predict(eval.features())?;
        let train_mse = MetricsCalculator::mse(train.labels(), train_fit.view())?;
        let eval_mse = MetricsCalculator::mse(eval.labels(), eval_fit.view())?;

        tracing::debug!(
            "Fold {}/{}: train {} eval {} mse {:.6}",
            k + 1,
            folds,
            train_len,
            block,
            eval_mse
        );

        results.push(FoldResult {
            fold: k + 1,
            train_len,
            eval_len: block,
            train_mse,
            eval_mse,
        });
    }

    let mean_mse = results.iter().map(|f| f.eval_mse).sum::<f64>() / results.len() as f64;
    tracing::info!(
        "Walk-forward validation over {} folds: mean MSE {:.6}",
        folds,
        mean_mse
    );

    Ok(CrossValidationReport {
        folds: results,
        mean_mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_models::LinearRegression;
    use forecast_preprocessing::pointwise;
    use ndarray::{Array1, Array2};

    #[allow(clippy::cast_precision_loss)]
    fn noisy_line(rows: usize) -> WindowSet {
        let features = Array2::from_shape_fn((rows, 2), |(r, c)| {
            let r = r as f64;
            if c == 0 {
                r / 10.0
            } else {
                (r * 0.9).sin()
            }
        });
        let labels = Array1::from_shape_fn(rows, |r| {
            features[[r, 0]] * 3.0 + features[[r, 1]] + (r as f64 * 2.3).cos() * 0.01
        });
        pointwise(features.view(), labels.view()).unwrap()
    }

    #[test]
    fn folds_expand_and_never_look_ahead() {
        let windows = noisy_line(62);
        let report = walk_forward_mse(LinearRegression::new, &windows, 5).unwrap();

        assert_eq!(report.folds.len(), 5);
        // 62 / 6 = 10 per block; the remainder widens the first training block
        assert_eq!(report.folds[0].train_len, 12);
        for pair in report.folds.windows(2) {
            assert_eq!(pair[1].train_len, pair[0].train_len + pair[0].eval_len);
        }
        let last = report.folds.last().unwrap();
        assert_eq!(last.train_len + last.eval_len, 62);
        for fold in &report.folds {
            assert_eq!(fold.eval_len, 10);
        }
    }

    #[test]
    fn mean_is_average_of_folds() {
        let windows = noisy_line(40);
        let report = walk_forward_mse(LinearRegression::new, &windows, 3).unwrap();

        let mean = report.folds.iter().map(|f| f.eval_mse).sum::<f64>() / 3.0;
        assert!((report.mean_mse - mean).abs() < 1e-15);
        assert!(report.mean_mse < 0.05);
        assert!(report.generalization_gap().is_finite());
    }

    #[test]
    fn factory_is_called_once_per_fold() {
        let windows = noisy_line(30);
        let mut built = 0;
        walk_forward_mse(
            || {
                built += 1;
                LinearRegression::new()
            },
            &windows,
            4,
        )
        .unwrap();
        assert_eq!(built, 4);
    }

    #[test]
    fn rejects_too_few_folds_or_windows() {
        let windows = noisy_line(5);
        assert!(matches!(
            walk_forward_mse(LinearRegression::new, &windows, 1),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(matches!(
            walk_forward_mse(LinearRegression::new, &windows, 5),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}
