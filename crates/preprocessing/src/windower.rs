//! Turns a multivariate series into supervised windows.
//!
//! Window `i` holds feature rows `[i, i + window_size)` and is labelled with
//! the target at row `i + window_size`, the step right after the window.
//! Sliding by one row gives `rows - window_size` windows.

use crate::splitter::ChronologicalSplit;
use forecast_core::{ForecastError, ForecastResult};
use ndarray::{s, Array1, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    features: Array3<f64>,
    labels: Array1<f64>,
    /// Source row of each window's label.
    label_rows: Vec<usize>,
}

impl WindowSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn window_size(&self) -> usize {
        self.features.len_of(Axis(1))
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len_of(Axis(2))
    }

    #[must_use]
    pub fn features(&self) -> ArrayView3<'_, f64> {
        self.features.view()
    }

    #[must_use]
    pub fn labels(&self) -> ArrayView1<'_, f64> {
        self.labels.view()
    }

    #[must_use]
    pub fn label_rows(&self) -> &[usize] {
        &self.label_rows
    }

    /// Copies a contiguous run of windows.
    ///
    /// # Panics
    ///
    /// Panics if the range runs past the end of the set.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            features: self
                .features
                .slice(s![range.start..range.end, .., ..])
                .to_owned(),
            labels: self.labels.slice(s![range.start..range.end]).to_owned(),
            label_rows: self.label_rows[range].to_vec(),
        }
    }

    /// Splits into `(train, eval)` at the split's cut.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the split was made for a different length.
    pub fn split(&self, split: &ChronologicalSplit) -> ForecastResult<(Self, Self)> {
        if split.total() != self.len() {
            return Err(ForecastError::invalid_parameter(format!(
                "split covers {} windows but the set has {}",
                split.total(),
                self.len()
            )));
        }
        Ok((self.slice(split.train_range()), self.slice(split.eval_range())))
    }
}

/// Slices `features` (T x F) and `labels` (T) into `T - window_size` windows.
///
/// # Errors
///
/// Returns `InvalidParameter` if `window_size` is 0 or not less than `T`, or
/// if feature and label lengths differ.
pub fn make_windows(
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, f64>,
    window_size: usize,
) -> ForecastResult<WindowSet> {
    let rows = features.nrows();
    if rows != labels.len() {
        return Err(ForecastError::invalid_parameter(format!(
            "{} feature rows but {} labels",
            rows,
            labels.len()
        )));
    }
    if window_size == 0 {
        return Err(ForecastError::invalid_parameter("window_size must be at least 1"));
    }
    if window_size >= rows {
        return Err(ForecastError::invalid_parameter(format!(
            "window_size {window_size} leaves no windows in {rows} rows"
        )));
    }

    let count = rows - window_size;
    let mut tensor = Array3::zeros((count, window_size, features.ncols()));
    for (i, mut window) in tensor.outer_iter_mut().enumerate() {
        window.assign(&features.slice(s![i..i + window_size, ..]));
    }
    let label_rows: Vec<usize> = (window_size..rows).collect();
    let window_labels = labels.slice(s![window_size..]).to_owned();

    tracing::debug!(
        "Built {} windows of {} x {}",
        count,
        window_size,
        features.ncols()
    );

    Ok(WindowSet {
        features: tensor,
        labels: window_labels,
        label_rows,
    })
}

/// Wraps each row as a one-step window labelled with the same row's target.
///
/// Used where features and target are contemporaneous, such as base-model
/// predictions for the same date as the real price.
///
/// # Errors
///
/// Returns `InvalidParameter` if lengths differ or the input is empty.
pub fn pointwise(
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, f64>,
) -> ForecastResult<WindowSet> {
    let rows = features.nrows();
    if rows != labels.len() {
        return Err(ForecastError::invalid_parameter(format!(
            "{} feature rows but {} labels",
            rows,
            labels.len()
        )));
    }
    if rows == 0 {
        return Err(ForecastError::invalid_parameter("no rows to window"));
    }

    Ok(WindowSet {
        features: features.to_owned().insert_axis(Axis(1)),
        labels: labels.to_owned(),
        label_rows: (0..rows).collect(),
    })
}

/// The `(1, window_size, F)` tensor of the last `window_size` rows, the input
/// for forecasting the step after the data ends.
///
/// # Errors
///
/// Returns `InvalidParameter` if `window_size` is 0 or exceeds the row count.
pub fn latest_window(
    features: ArrayView2<'_, f64>,
    window_size: usize,
) -> ForecastResult<Array3<f64>> {
    let rows = features.nrows();
    if window_size == 0 || window_size > rows {
        return Err(ForecastError::invalid_parameter(format!(
            "cannot take a window of {window_size} from {rows} rows"
        )));
    }
    Ok(features
        .slice(s![rows - window_size.., ..])
        .to_owned()
        .insert_axis(Axis(0)))
}
