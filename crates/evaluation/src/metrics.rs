use forecast_core::{ForecastError, ForecastResult, MapePolicy, RegressionMetrics};
use ndarray::ArrayView1;

pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Computes MAE, MSE, RMSE and MAPE over paired real/predicted values.
    ///
    /// MAPE is `mean(|real - predicted| / |real|)` as a fraction. The
    /// denominator is the absolute real value, so a negative real still
    /// yields a non-negative percentage error. How a zero real value is
    /// treated depends on `policy`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the inputs are empty or differ in length, and
    /// `DivideByZero` if MAPE cannot be computed under `policy`.
    pub fn calculate(
        real: ArrayView1<'_, f64>,
        predicted: ArrayView1<'_, f64>,
        policy: MapePolicy,
    ) -> ForecastResult<RegressionMetrics> {
        let metrics = Self::score(real, predicted, policy)?;
        if metrics.mape.is_nan() {
            return Err(ForecastError::divide_by_zero(
                "MAPE is undefined: every real value is 0",
            ));
        }
        Ok(metrics)
    }

    /// Scores values in scaled units, where 0 is simply the column minimum.
    ///
    /// Zero reals are left out of MAPE, and MAPE is `NaN` when none remain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the inputs are empty or differ in length.
    pub fn calculate_scaled(
        real: ArrayView1<'_, f64>,
        predicted: ArrayView1<'_, f64>,
    ) -> ForecastResult<RegressionMetrics> {
        Self::score(real, predicted, MapePolicy::Skip)
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(
        real: ArrayView1<'_, f64>,
        predicted: ArrayView1<'_, f64>,
        policy: MapePolicy,
    ) -> ForecastResult<RegressionMetrics> {
        Self::check_pair(real, predicted)?;

        let samples = real.len();
        let n = samples as f64;

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut pct_sum = 0.0;
        let mut pct_count = 0usize;

        for (&r, &p) in real.iter().zip(predicted.iter()) {
            let error = r - p;
            abs_sum += error.abs();
            sq_sum += error * error;

            if r == 0.0 {
                match policy {
                    MapePolicy::Fail => {
                        return Err(ForecastError::divide_by_zero(
                            "MAPE is undefined where the real value is 0",
                        ));
                    }
                    MapePolicy::Skip => continue,
                }
            }
            pct_sum += error.abs() / r.abs();
            pct_count += 1;
        }

        if pct_count < samples {
            tracing::debug!(
                "MAPE skipped {} zero-valued real(s) of {}",
                samples - pct_count,
                samples
            );
        }

        let mse = sq_sum / n;
        let mape = if pct_count == 0 {
            f64::NAN
        } else {
            pct_sum / pct_count as f64
        };
        Ok(RegressionMetrics {
            mae: abs_sum / n,
            mse,
            rmse: mse.sqrt(),
            mape,
            samples,
        })
    }

    /// Mean squared error alone, for model selection where MAPE is irrelevant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the inputs are empty or differ in length.
    #[allow(clippy::cast_precision_loss)]
    pub fn mse(real: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> ForecastResult<f64> {
        Self::check_pair(real, predicted)?;
        let sq_sum: f64 = real
            .iter()
            .zip(predicted.iter())
            .map(|(r, p)| (r - p) * (r - p))
            .sum();
        Ok(sq_sum / real.len() as f64)
    }

    fn check_pair(real: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> ForecastResult<()> {
        if real.len() != predicted.len() {
            return Err(ForecastError::invalid_input(format!(
                "{} real values but {} predictions",
                real.len(),
                predicted.len()
            )));
        }
        if real.is_empty() {
            return Err(ForecastError::invalid_input("no values to score"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn two_point_example() {
        let real = array![100.0, 200.0];
        let predicted = array![110.0, 190.0];

        let m = MetricsCalculator::calculate(real.view(), predicted.view(), MapePolicy::Fail)
            .unwrap();

        assert_close(m.mae, 10.0);
        assert_close(m.mse, 100.0);
        assert_close(m.rmse, 10.0);
        assert_close(m.mape, 0.075);
        assert_eq!(m.samples, 2);
    }

    #[test]
    fn perfect_predictions_score_zero() {
        let real = array![1.0, 2.0, 3.0];
        let m =
            MetricsCalculator::calculate(real.view(), real.view(), MapePolicy::Fail).unwrap();
        assert_close(m.mae, 0.0);
        assert_close(m.rmse, 0.0);
        assert_close(m.mape, 0.0);
    }

    #[test]
    fn rmse_never_below_mae() {
        let real = array![10.0, 12.0, 9.0, 15.0, 11.0];
        let predicted = array![11.0, 12.5, 5.0, 15.2, 10.0];

        let m = MetricsCalculator::calculate(real.view(), predicted.view(), MapePolicy::Fail)
            .unwrap();

        assert!(m.mae >= 0.0);
        assert!(m.rmse >= m.mae);
    }

    #[test]
    fn zero_real_fails_by_default() {
        let real = array![0.0, 2.0];
        let predicted = array![1.0, 2.0];

        let err = MetricsCalculator::calculate(real.view(), predicted.view(), MapePolicy::Fail)
            .unwrap_err();
        assert!(matches!(err, ForecastError::DivideByZero(_)));
    }

    #[test]
    fn skip_policy_averages_over_nonzero_reals() {
        let real = array![0.0, 2.0, 4.0];
        let predicted = array![1.0, 1.0, 5.0];

        let m = MetricsCalculator::calculate(real.view(), predicted.view(), MapePolicy::Skip)
            .unwrap();

        // (0.5 + 0.25) / 2
        assert_close(m.mape, 0.375);
        // MAE still covers every pair
        assert_close(m.mae, 1.0);

        let zeros = array![0.0, 0.0];
        assert!(matches!(
            MetricsCalculator::calculate(zeros.view(), zeros.view(), MapePolicy::Skip),
            Err(ForecastError::DivideByZero(_))
        ));
    }

    #[test]
    fn scaled_metrics_tolerate_all_zero_reals() {
        let zeros = array![0.0, 0.0];
        let predicted = array![0.1, -0.1];

        let m = MetricsCalculator::calculate_scaled(zeros.view(), predicted.view()).unwrap();

        assert!(m.mape.is_nan());
        assert_close(m.mae, 0.1);
        assert_close(m.mse, 0.01);
    }

    #[test]
    fn negative_reals_use_absolute_denominator() {
        let real = array![-4.0];
        let predicted = array![-3.0];
        let m = MetricsCalculator::calculate(real.view(), predicted.view(), MapePolicy::Fail)
            .unwrap();
        assert_close(m.mape, 0.25);
    }

    #[test]
    fn rejects_mismatched_or_empty_input() {
        let a = array![1.0, 2.0];
        let b = array![1.0];
        let empty = ndarray::Array1::<f64>::zeros(0);

        assert!(matches!(
            MetricsCalculator::calculate(a.view(), b.view(), MapePolicy::Fail),
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(matches!(
            MetricsCalculator::calculate(empty.view(), empty.view(), MapePolicy::Fail),
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(MetricsCalculator::mse(a.view(), b.view()).is_err());
    }

    #[test]
    fn mse_matches_full_metrics() {
        let real = array![3.0, -1.0, 4.0];
        let predicted = array![2.0, 1.0, 4.0];
        let mse = MetricsCalculator::mse(real.view(), predicted.view()).unwrap();
        assert_close(mse, 5.0 / 3.0);
    }
}
