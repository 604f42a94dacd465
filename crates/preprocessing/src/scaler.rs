//! Min-max normalization with an explicit, immutable fit.
//!
//! [`MinMaxScaler::fit`] returns a [`ScalerParams`] value that every later
//! forward and inverse transform must be threaded through. Transforms are
//! defined jointly over all fitted columns, so the inverse always runs on
//! full-width rows; [`ScalerParams::inverse_column`] pads the other columns
//! with zeros when only one column's values are meaningful.
//!
//! A constant column (max == min) has no usable scale and fails the fit with
//! `DivideByZero`.

use forecast_core::{ForecastError, ForecastResult, TimeSeriesTable};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    range: (f64, f64),
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self { range: (0.0, 1.0) }
    }
}

impl MinMaxScaler {
    /// Creates a scaler mapping each column onto `range`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` unless both bounds are finite and `lo < hi`.
    pub fn new(range: (f64, f64)) -> ForecastResult<Self> {
        let (lo, hi) = range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(ForecastError::invalid_parameter(format!(
                "scaler range must be finite with min < max, got ({lo}, {hi})"
            )));
        }
        Ok(Self { range })
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Fits per-column bounds over every row of the table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty table or a non-finite value, and
    /// `DivideByZero` for a constant column.
    pub fn fit(&self, table: &TimeSeriesTable) -> ForecastResult<ScalerParams> {
        self.fit_values(table.columns().to_vec(), table.values())
    }

    /// Fits per-column bounds over a bare matrix with the given column names.
    ///
    /// # Errors
    ///
    /// Same conditions as [`MinMaxScaler::fit`], plus `InvalidInput` when the
    /// name count differs from the column count.
    pub fn fit_values(
        &self,
        columns: Vec<String>,
        values: ArrayView2<'_, f64>,
    ) -> ForecastResult<ScalerParams> {
        if values.nrows() == 0 {
            return Err(ForecastError::invalid_input("cannot fit scaler on an empty table"));
        }
        if columns.len() != values.ncols() {
            return Err(ForecastError::invalid_input(format!(
                "{} column names for {} columns",
                columns.len(),
                values.ncols()
            )));
        }

        let mut min = Vec::with_capacity(columns.len());
        let mut max = Vec::with_capacity(columns.len());
        for (name, column) in columns.iter().zip(values.axis_iter(Axis(1))) {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(ForecastError::invalid_input(format!(
                    "column '{name}' holds a missing or non-finite value"
                )));
            }
            let lo = column.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if hi == lo {
                return Err(ForecastError::divide_by_zero(format!(
                    "column '{name}' is constant ({lo}); min-max scale is undefined"
                )));
            }
            min.push(lo);
            max.push(hi);
        }

        tracing::debug!("Fitted min-max scaler over {} columns", columns.len());

        Ok(ScalerParams {
            columns,
            min,
            max,
            range: self.range,
        })
    }
}

/// Fitted min-max parameters, in fit-time column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    columns: Vec<String>,
    min: Vec<f64>,
    max: Vec<f64>,
    range: (f64, f64),
}

impl ScalerParams {
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    #[must_use]
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Maps raw values into the fitted range. Values beyond the fitted bounds
    /// land outside the range; that is expected for unseen data.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the width differs from the fitted column count.
    pub fn transform(&self, values: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>> {
        self.check_width(values.ncols())?;
        let (lo, hi) = self.range;
        let mut out = values.to_owned();
        for (c, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, span) = (self.min[c], self.max[c] - self.min[c]);
            column.mapv_inplace(|v| lo + (v - min) / span * (hi - lo));
        }
        Ok(out)
    }

    /// Maps scaled values back to original units.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the width differs from the fitted column count.
    pub fn inverse_transform(&self, values: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>> {
        self.check_width(values.ncols())?;
        let (lo, hi) = self.range;
        let mut out = values.to_owned();
        for (c, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, span) = (self.min[c], self.max[c] - self.min[c]);
            column.mapv_inplace(|v| min + (v - lo) / (hi - lo) * span);
        }
        Ok(out)
    }

    /// Inverse-transforms the values of a single fitted column.
    ///
    /// The values are placed into a full-width matrix whose other columns are
    /// zero placeholders, the whole matrix is inverted, and the named column
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the column was not part of the fit.
    pub fn inverse_column(
        &self,
        name: &str,
        values: ArrayView1<'_, f64>,
    ) -> ForecastResult<Array1<f64>> {
        let idx = self.column_index(name).ok_or_else(|| {
            ForecastError::invalid_input(format!(
                "column '{name}' was not part of the scaler fit"
            ))
        })?;

        let mut full = Array2::zeros((values.len(), self.columns.len()));
        full.column_mut(idx).assign(&values);
        let restored = self.inverse_transform(full.view())?;
        Ok(restored.column(idx).to_owned())
    }

    fn check_width(&self, width: usize) -> ForecastResult<()> {
        if width == self.columns.len() {
            Ok(())
        } else {
            Err(ForecastError::invalid_input(format!(
                "expected {} columns as fitted, got {}",
                self.columns.len(),
                width
            )))
        }
    }
}
