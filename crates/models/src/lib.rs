//! Predictor implementations.
//!
//! Every model here implements [`forecast_core::Predictor`], so pipelines can
//! swap one for another without changes.

pub mod linear_regression;

pub use linear_regression::LinearRegression;
