use forecast_core::{ForecastError, ForecastResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single cut over an ordered sequence: `[0, cut)` trains, `[cut, total)`
/// evaluates. No shuffling, so nothing in the training side can come from
/// after the evaluation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronologicalSplit {
    total: usize,
    cut: usize,
}

impl ChronologicalSplit {
    /// Splits `total` items with the cut at `floor(total * fraction)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `fraction` is not strictly between 0 and
    /// 1, or if either side would be empty.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn by_fraction(total: usize, fraction: f64) -> ForecastResult<Self> {
        if !(fraction.is_finite() && fraction > 0.0 && fraction < 1.0) {
            return Err(ForecastError::invalid_parameter(format!(
                "split fraction must lie strictly between 0 and 1, got {fraction}"
            )));
        }
        let cut = (total as f64 * fraction).floor() as usize;
        Self::by_count(total, cut)
    }

    /// Splits `total` items with exactly `train` items on the training side.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `train` is 0 or not less than `total`.
    pub fn by_count(total: usize, train: usize) -> ForecastResult<Self> {
        if train == 0 || train >= total {
            return Err(ForecastError::invalid_parameter(format!(
                "degenerate split: {train} training items out of {total}"
            )));
        }
        Ok(Self { total, cut: train })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn train_len(&self) -> usize {
        self.cut
    }

    #[must_use]
    pub fn eval_len(&self) -> usize {
        self.total - self.cut
    }

    #[must_use]
    pub fn train_range(&self) -> Range<usize> {
        0..self.cut
    }

    #[must_use]
    pub fn eval_range(&self) -> Range<usize> {
        self.cut..self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eighty_twenty_split() {
        let split = ChronologicalSplit::by_fraction(100, 0.8).unwrap();
        assert_eq!(split.train_len(), 80);
        assert_eq!(split.eval_len(), 20);
        assert_eq!(split.train_range(), 0..80);
        assert_eq!(split.eval_range(), 80..100);
    }

    #[test]
    fn fraction_rounds_down() {
        // 2436 windows in the original run
        let split = ChronologicalSplit::by_fraction(2436, 0.8).unwrap();
        assert_eq!(split.train_len(), 1948);
        assert_eq!(split.eval_len(), 488);
    }

    #[test]
    fn rejects_degenerate_counts() {
        assert!(matches!(
            ChronologicalSplit::by_count(10, 0),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(ChronologicalSplit::by_count(10, 10).is_err());
        assert!(ChronologicalSplit::by_count(10, 11).is_err());
        assert!(ChronologicalSplit::by_count(10, 9).is_ok());
    }

    #[test]
    fn rejects_bad_fractions() {
        for fraction in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(
                ChronologicalSplit::by_fraction(100, fraction).is_err(),
                "fraction {fraction} accepted"
            );
        }
        // too few items for any training side
        assert!(ChronologicalSplit::by_fraction(1, 0.8).is_err());
    }
}
