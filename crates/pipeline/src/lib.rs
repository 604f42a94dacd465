//! Pipelines composing the preprocessing, model and evaluation stages.
//!
//! Both pipelines are pure over an in-memory [`forecast_core::TimeSeriesTable`];
//! loading inputs and writing results belong to the caller.

pub mod forecast;
pub mod stacking;

pub use forecast::{ForecastPipeline, ForecastReport};
pub use stacking::{StackingPipeline, StackingReport};

use forecast_core::{ForecastError, ForecastResult};

/// Fails unless a model returned exactly one prediction per window.
pub(crate) fn check_prediction_count(expected: usize, got: usize) -> ForecastResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(ForecastError::invalid_input(format!(
            "model returned {got} predictions for {expected} windows"
        )))
    }
}
