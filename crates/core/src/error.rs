//! Error taxonomy shared by every forecasting stage.
//!
//! All variants are fatal to a run. Pure stages return [`ForecastResult`];
//! I/O-facing layers wrap these in `anyhow::Error` so callers can still
//! `downcast_ref::<ForecastError>()` to inspect the kind.

use thiserror::Error;

/// Errors raised by the data-preparation, modelling and reporting stages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    /// A configuration value is out of its valid domain (window size, split fraction, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The data handed to a stage violates its contract (missing column, empty table, NaN, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A computation would divide by zero (constant scaler column, zero real value in MAPE).
    #[error("division by zero: {0}")]
    DivideByZero(String),
}

impl ForecastError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn divide_by_zero(message: impl Into<String>) -> Self {
        Self::DivideByZero(message.into())
    }
}

pub type ForecastResult<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = ForecastError::invalid_parameter("window_size must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter: window_size must be at least 1"
        );
    }

    #[test]
    fn survives_anyhow_round_trip() {
        let err: anyhow::Error = ForecastError::divide_by_zero("column 'VIXCLS' is constant").into();
        let kind = err.downcast_ref::<ForecastError>();
        assert!(matches!(kind, Some(ForecastError::DivideByZero(_))));
    }
}
