//! Date-keyed table of numeric columns.
//!
//! Rows are always sorted ascending by date with no duplicates. Missing cells
//! are stored as `NaN` until [`TimeSeriesTable::drop_missing`] removes them.

use crate::error::{ForecastError, ForecastResult};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Which columns of a delimited source to keep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSelection {
    /// Every column except the date key.
    #[default]
    All,
    /// Columns by header name, in the given order.
    Names(Vec<String>),
    /// Columns by header position (the date column's own position is ignored).
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl TimeSeriesTable {
    /// Creates a table from already-ordered parts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if shapes disagree, column names repeat, or
    /// dates are not strictly ascending.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Array2<f64>,
    ) -> ForecastResult<Self> {
        if values.nrows() != dates.len() {
            return Err(ForecastError::invalid_input(format!(
                "{} dates but {} value rows",
                dates.len(),
                values.nrows()
            )));
        }
        if values.ncols() != columns.len() {
            return Err(ForecastError::invalid_input(format!(
                "{} column names but {} value columns",
                columns.len(),
                values.ncols()
            )));
        }
        ensure_unique_columns(&columns)?;
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ForecastError::invalid_input(format!(
                "dates must be strictly ascending, found {} followed by {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Creates a table from rows in any order, sorting them by date.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on a duplicate date or a row of the wrong width.
    pub fn from_rows(
        columns: Vec<String>,
        mut rows: Vec<(NaiveDate, Vec<f64>)>,
    ) -> ForecastResult<Self> {
        rows.sort_by_key(|(date, _)| *date);

        if let Some(pair) = rows.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(ForecastError::invalid_input(format!(
                "duplicate date {}",
                pair[0].0
            )));
        }

        let width = columns.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        let mut dates = Vec::with_capacity(rows.len());
        for (date, row) in rows {
            if row.len() != width {
                return Err(ForecastError::invalid_input(format!(
                    "row for {date} has {} values, expected {width}",
                    row.len()
                )));
            }
            dates.push(date);
            flat.extend(row);
        }

        let values = Array2::from_shape_vec((dates.len(), width), flat)
            .map_err(|e| ForecastError::invalid_input(e.to_string()))?;
        Self::new(dates, columns, values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns one column by name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the column does not exist.
    pub fn column(&self, name: &str) -> ForecastResult<ArrayView1<'_, f64>> {
        let idx = self.require_column(name)?;
        Ok(self.values.column(idx))
    }

    /// Keeps only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any name is unknown.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> ForecastResult<Self> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name.as_ref()))
            .collect::<ForecastResult<Vec<_>>>()?;
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        Self::new(
            self.dates.clone(),
            columns,
            self.values.select(Axis(1), &indices),
        )
    }

    /// Returns the table with its columns renamed position by position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the name count differs or names repeat.
    pub fn renamed<S: AsRef<str>>(&self, names: &[S]) -> ForecastResult<Self> {
        if names.len() != self.columns.len() {
            return Err(ForecastError::invalid_input(format!(
                "cannot rename {} columns with {} names",
                self.columns.len(),
                names.len()
            )));
        }
        let columns = names.iter().map(|n| n.as_ref().to_string()).collect();
        Self::new(self.dates.clone(), columns, self.values.clone())
    }

    /// Outer-merges two tables on date.
    ///
    /// The result holds every date of either side and `self`'s columns
    /// followed by the columns only `other` has. Where both sides carry a
    /// column, `self`'s value wins unless it is missing.
    #[must_use]
    pub fn combine_first(&self, other: &Self) -> Self {
        let dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .chain(other.dates.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(
            other
                .columns
                .iter()
                .filter(|c| !self.columns.contains(c))
                .cloned(),
        );

        let left_rows = row_lookup(&self.dates);
        let right_rows = row_lookup(&other.dates);
        let left_cols: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let right_cols: Vec<Option<usize>> =
            columns.iter().map(|c| other.column_index(c)).collect();

        let mut values = Array2::from_elem((dates.len(), columns.len()), f64::NAN);
        for (row, date) in dates.iter().enumerate() {
            let left_row = left_rows.get(date);
            let right_row = right_rows.get(date);
            for col in 0..columns.len() {
                let left = match (left_row, left_cols[col]) {
                    (Some(&r), Some(c)) => self.values[[r, c]],
                    _ => f64::NAN,
                };
                values[[row, col]] = if left.is_nan() {
                    match (right_row, right_cols[col]) {
                        (Some(&r), Some(c)) => other.values[[r, c]],
                        _ => f64::NAN,
                    }
                } else {
                    left
                };
            }
        }

        Self {
            dates,
            columns,
            values,
        }
    }

    /// Inner-joins two tables on date, concatenating their columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the two sides share a column name.
    pub fn inner_join(&self, other: &Self) -> ForecastResult<Self> {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        ensure_unique_columns(&columns)?;

        let right_rows = row_lookup(&other.dates);
        let mut dates = Vec::new();
        let mut flat = Vec::new();
        for (left_row, date) in self.dates.iter().enumerate() {
            if let Some(&right_row) = right_rows.get(date) {
                dates.push(*date);
                flat.extend(self.values.row(left_row).iter().copied());
                flat.extend(other.values.row(right_row).iter().copied());
            }
        }

        let values = Array2::from_shape_vec((dates.len(), columns.len()), flat)
            .map_err(|e| ForecastError::invalid_input(e.to_string()))?;
        Self::new(dates, columns, values)
    }

    /// Removes every row holding at least one missing value.
    #[must_use]
    pub fn drop_missing(&self) -> Self {
        let keep: Vec<usize> = self
            .values
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| !v.is_nan()))
            .map(|(i, _)| i)
            .collect();

        Self {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), &keep),
        }
    }

    /// Checks that no cell is missing or non-finite.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first offending date and column.
    pub fn ensure_complete(&self) -> ForecastResult<()> {
        for ((row, col), value) in self.values.indexed_iter() {
            if !value.is_finite() {
                return Err(ForecastError::invalid_input(format!(
                    "non-finite value in column '{}' on {}",
                    self.columns[col], self.dates[row]
                )));
            }
        }
        Ok(())
    }

    fn require_column(&self, name: &str) -> ForecastResult<usize> {
        self.column_index(name).ok_or_else(|| {
            ForecastError::invalid_input(format!(
                "missing required column '{name}' (available: {})",
                self.columns.join(", ")
            ))
        })
    }
}

fn row_lookup(dates: &[NaiveDate]) -> HashMap<NaiveDate, usize> {
    dates.iter().enumerate().map(|(i, d)| (*d, i)).collect()
}

fn ensure_unique_columns(columns: &[String]) -> ForecastResult<()> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(ForecastError::invalid_input(format!(
                "duplicate column '{column}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn econ() -> TimeSeriesTable {
        TimeSeriesTable::new(
            vec![day(2), day(3), day(4)],
            vec!["Adj Close".into(), "VIXCLS".into()],
            array![[10.0, 20.0], [11.0, f64::NAN], [12.0, 22.0]],
        )
        .unwrap()
    }

    // ============================================================
    // Construction
    // ============================================================

    #[test]
    fn from_rows_sorts_by_date() {
        let table = TimeSeriesTable::from_rows(
            vec!["a".into()],
            vec![(day(5), vec![5.0]), (day(1), vec![1.0]), (day(3), vec![3.0])],
        )
        .unwrap();

        assert_eq!(table.dates(), &[day(1), day(3), day(5)]);
        assert_eq!(table.column("a").unwrap().to_vec(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn from_rows_rejects_duplicate_dates() {
        let err = TimeSeriesTable::from_rows(
            vec!["a".into()],
            vec![(day(1), vec![1.0]), (day(1), vec![2.0])],
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn new_rejects_unsorted_dates() {
        let err = TimeSeriesTable::new(
            vec![day(2), day(1)],
            vec!["a".into()],
            array![[1.0], [2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    // ============================================================
    // Selection
    // ============================================================

    #[test]
    fn select_reorders_columns() {
        let table = econ().select(&["VIXCLS", "Adj Close"]).unwrap();
        assert_eq!(table.columns(), &["VIXCLS".to_string(), "Adj Close".to_string()]);
        assert_eq!(table.values()[[0, 0]], 20.0);
    }

    #[test]
    fn select_unknown_column_fails() {
        let err = econ().select(&["T10Y2Y"]).unwrap_err();
        assert!(err.to_string().contains("T10Y2Y"));
    }

    // ============================================================
    // Merging
    // ============================================================

    #[test]
    fn combine_first_prefers_left_and_fills_gaps() {
        let industry = TimeSeriesTable::new(
            vec![day(3), day(5)],
            vec!["VIXCLS".into(), "XLK".into()],
            array![[21.0, 100.0], [25.0, 105.0]],
        )
        .unwrap();

        let merged = econ().combine_first(&industry);

        assert_eq!(merged.dates(), &[day(2), day(3), day(4), day(5)]);
        assert_eq!(
            merged.columns(),
            &["Adj Close".to_string(), "VIXCLS".to_string(), "XLK".to_string()]
        );
        // gap on day 3 filled from the right side
        assert_eq!(merged.values()[[1, 1]], 21.0);
        // day 2 only on the left
        assert_eq!(merged.values()[[0, 1]], 20.0);
        assert!(merged.values()[[0, 2]].is_nan());
        // day 5 only on the right
        assert!(merged.values()[[3, 0]].is_nan());
        assert_eq!(merged.values()[[3, 2]], 105.0);
    }

    #[test]
    fn drop_missing_then_complete() {
        let cleaned = econ().drop_missing();
        assert_eq!(cleaned.dates(), &[day(2), day(4)]);
        assert!(cleaned.ensure_complete().is_ok());
        assert!(econ().ensure_complete().is_err());
    }

    #[test]
    fn inner_join_keeps_shared_dates() {
        let other = TimeSeriesTable::new(
            vec![day(1), day(3), day(4)],
            vec!["fs".into()],
            array![[0.5], [0.6], [0.7]],
        )
        .unwrap();

        let joined = econ().inner_join(&other).unwrap();
        assert_eq!(joined.dates(), &[day(3), day(4)]);
        assert_eq!(joined.columns().len(), 3);
        assert_eq!(joined.values()[[1, 2]], 0.7);
    }

    #[test]
    fn inner_join_rejects_clashing_columns() {
        let err = econ().inner_join(&econ()).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }
}
