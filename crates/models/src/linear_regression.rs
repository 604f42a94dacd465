//! Ordinary least squares over flattened windows.
//!
//! Each `(window_size, features)` window becomes one row of
//! `window_size * features` regressors. The model fits an intercept plus one
//! coefficient per regressor by solving the centered normal equations
//! `(XᵀX + λI) β = Xᵀy`; `λ = 0` is plain OLS, `λ > 0` is ridge.

use forecast_core::{ForecastError, ForecastResult, Predictor};
use ndarray::{Array1, Array2, ArrayView1, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    ridge: f64,
    fitted: Option<FittedModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedModel {
    window_size: usize,
    n_features: usize,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegression {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the L2 penalty applied to coefficients (never to the intercept).
    #[must_use]
    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge;
        self
    }

    /// Coefficients in flattened window order (step-major, feature-minor).
    #[must_use]
    pub fn coefficients(&self) -> Option<ArrayView1<'_, f64>> {
        self.fitted.as_ref().map(|m| m.coefficients.view())
    }

    #[must_use]
    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|m| m.intercept)
    }
}

impl Predictor for LinearRegression {
    fn fit(
        &mut self,
        features: ArrayView3<'_, f64>,
        labels: ArrayView1<'_, f64>,
    ) -> ForecastResult<()> {
        if !(self.ridge.is_finite() && self.ridge >= 0.0) {
            return Err(ForecastError::invalid_parameter(format!(
                "ridge must be a non-negative number, got {}",
                self.ridge
            )));
        }
        let (samples, window_size, n_features) = features.dim();
        if samples != labels.len() {
            return Err(ForecastError::invalid_input(format!(
                "{} windows but {} labels",
                samples,
                labels.len()
            )));
        }
        if samples == 0 {
            return Err(ForecastError::invalid_input("cannot fit on zero windows"));
        }
        if features.iter().chain(labels.iter()).any(|v| !v.is_finite()) {
            return Err(ForecastError::invalid_input(
                "training data holds a missing or non-finite value",
            ));
        }

        let x = flatten(features)?;
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ForecastError::invalid_input("cannot fit on zero windows"))?;
        let y_mean = labels
            .mean()
            .ok_or_else(|| ForecastError::invalid_input("cannot fit on zero windows"))?;

        let centered_x = &x - &x_mean;
        let centered_y = labels.mapv(|y| y - y_mean);

        let mut gram = centered_x.t().dot(&centered_x);
        gram.diag_mut().mapv_inplace(|v| v + self.ridge);
        let moment = centered_x.t().dot(&centered_y);

        let coefficients = solve(gram, moment)?;
        let intercept = y_mean - x_mean.dot(&coefficients);

        tracing::debug!(
            "Fitted linear regression on {} windows x {} regressors (ridge {})",
            samples,
            coefficients.len(),
            self.ridge
        );

        self.fitted = Some(FittedModel {
            window_size,
            n_features,
            coefficients,
            intercept,
        });
        Ok(())
    }

    fn predict(&self, features: ArrayView3<'_, f64>) -> ForecastResult<Array1<f64>> {
        let model = self
            .fitted
            .as_ref()
            .ok_or_else(|| ForecastError::invalid_input("linear regression is not fitted"))?;

        let (_, window_size, n_features) = features.dim();
        if (window_size, n_features) != (model.window_size, model.n_features) {
            return Err(ForecastError::invalid_input(format!(
                "windows of {} x {} do not match the fitted {} x {}",
                window_size, n_features, model.window_size, model.n_features
            )));
        }

        let x = flatten(features)?;
        Ok(x.dot(&model.coefficients) + model.intercept)
    }

    fn name(&self) -> &str {
        "linear-regression"
    }
}

fn flatten(features: ArrayView3<'_, f64>) -> ForecastResult<Array2<f64>> {
    let (samples, window_size, n_features) = features.dim();
    Array2::from_shape_vec(
        (samples, window_size * n_features),
        features.iter().copied().collect(),
    )
    .map_err(|e| ForecastError::invalid_input(e.to_string()))
}

/// Solves `a x = b` by Gaussian elimination with partial pivoting.
#[allow(clippy::cast_precision_loss)]
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> ForecastResult<Array1<f64>> {
    let n = b.len();
    if n == 0 {
        return Ok(b);
    }

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = scale * f64::EPSILON * n as f64;
    let singular = || {
        ForecastError::invalid_input(
            "design matrix is singular; regressors are collinear or too few windows (try a ridge penalty)",
        )
    };
    if scale == 0.0 {
        return Err(singular());
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= tolerance {
            return Err(singular());
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                let delta = factor * a[[col, k]];
                a[[row, k]] -= delta;
            }
            let delta = factor * b[col];
            b[row] -= delta;
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}
