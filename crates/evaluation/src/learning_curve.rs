use crate::metrics::MetricsCalculator;
use forecast_core::{ForecastError, ForecastResult, Predictor};
use forecast_preprocessing::WindowSet;
use serde::{Deserialize, Serialize};

/// Training and held-out error after fitting on the first `train_size` windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    pub train_size: usize,
    pub train_mse: f64,
    pub validation_mse: f64,
}

/// Refits a fresh model on growing prefixes of `train` and scores each one on
/// the prefix itself and on all of `eval`.
///
/// Prefix sizes are `steps` evenly spaced fractions from 0.1 to 1.0 of the
/// training length, floored, at least 1, duplicates removed.
///
/// # Errors
///
/// Returns `InvalidParameter` if `steps` is 0 or `train` is empty, and
/// propagates model errors.
pub fn learning_curve<P, F>(
    mut factory: F,
    train: &WindowSet,
    eval: &WindowSet,
    steps: usize,
) -> ForecastResult<Vec<LearningCurvePoint>>
where
    P: Predictor,
    F: FnMut() -> P,
{
    if steps == 0 {
        return Err(ForecastError::invalid_parameter(
            "learning curve needs at least one step",
        ));
    }
    if train.is_empty() {
        return Err(ForecastError::invalid_parameter(
            "learning curve needs training windows",
        ));
    }

    let mut points = Vec::new();
    for size in train_sizes(train.len(), steps) {
        let prefix = train.slice(0..size);
        let mut model = factory();
        model.fit(prefix.features(), prefix.labels())?;

        let prefix_fit = model.predict(prefix.features())?;
        let eval_fit = model.predict(eval.features())?;
        points.push(LearningCurvePoint {
            train_size: size,
            train_mse: MetricsCalculator::mse(prefix.labels(), prefix_fit.view())?,
            validation_mse: MetricsCalculator::mse(eval.labels(), eval_fit.view())?,
        });
    }

    tracing::debug!("Learning curve computed at {} train sizes", points.len());
    Ok(points)
}

/// `floor(total * (0.1 + 0.9 * i / (steps - 1)))` in integer arithmetic, so
/// round fractions such as 0.7 land exactly.
fn train_sizes(total: usize, steps: usize) -> Vec<usize> {
    if steps == 1 {
        return vec![total];
    }
    let span = steps - 1;
    let mut sizes: Vec<usize> = (0..steps)
        .map(|i| (total * (span + 9 * i) / (10 * span)).clamp(1, total))
        .collect();
    sizes.dedup();
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_models::LinearRegression;
    use forecast_preprocessing::pointwise;
    use ndarray::Array2;

    #[test]
    fn sizes_span_ten_to_hundred_percent() {
        assert_eq!(
            train_sizes(100, 10),
            vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
        );
        assert_eq!(train_sizes(50, 1), vec![50]);
        // tiny sets collapse to distinct sizes only
        assert_eq!(train_sizes(3, 10), vec![1, 2, 3]);
    }

    #[allow(clippy::cast_precision_loss)]
    fn linear_windows(range: std::ops::Range<usize>) -> WindowSet {
        let rows = range.len();
        let start = range.start;
        let features = Array2::from_shape_fn((rows, 1), |(r, _)| (start + r) as f64);
        let labels = features.column(0).mapv(|x| 2.0 * x + 1.0);
        pointwise(features.view(), labels.view()).unwrap()
    }

    #[test]
    fn curve_has_one_point_per_size() {
        let train = linear_windows(0..40);
        let eval = linear_windows(40..50);

        let curve = learning_curve(
            || LinearRegression::new().with_ridge(1e-9),
            &train,
            &eval,
            4,
        )
        .unwrap();

        let sizes: Vec<usize> = curve.iter().map(|p| p.train_size).collect();
        assert_eq!(sizes, vec![4, 16, 28, 40]);
        for point in &curve {
            assert!(point.train_mse < 1e-6);
            assert!(point.validation_mse < 1e-6);
        }
    }

    #[test]
    fn zero_steps_is_rejected() {
        let train = linear_windows(0..10);
        let eval = linear_windows(10..12);
        assert!(matches!(
            learning_curve(LinearRegression::new, &train, &eval, 0),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}
