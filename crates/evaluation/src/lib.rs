//! Scoring of predictions and of the models that produce them.

pub mod cross_validation;
pub mod learning_curve;
pub mod metrics;

pub use cross_validation::{walk_forward_mse, CrossValidationReport, FoldResult};
pub use learning_curve::{learning_curve, LearningCurvePoint};
pub use metrics::MetricsCalculator;
