use crate::error::ForecastResult;
use ndarray::{Array1, ArrayView1, ArrayView3};

/// A point predictor over windowed feature tensors.
///
/// Inputs are `(windows, window_size, features)` tensors in the scaler's
/// normalized space; outputs are one normalized value per window. Pipelines
/// make no other assumption about the model, so a recurrent network and a
/// linear regressor are interchangeable here.
pub trait Predictor {
    /// Trains the model on labelled windows.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are malformed or the model cannot be fit.
    fn fit(&mut self, features: ArrayView3<'_, f64>, labels: ArrayView1<'_, f64>)
        -> ForecastResult<()>;

    /// Predicts one value per input window.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is unfitted or the input shape differs
    /// from the one seen during `fit`.
    fn predict(&self, features: ArrayView3<'_, f64>) -> ForecastResult<Array1<f64>>;

    fn name(&self) -> &str;
}
