use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim, Writer};
use forecast_core::{
    ColumnSelection, ForecastError, PredictionRecord, StackingRecord, TimeSeriesTable,
    DATE_COLUMN, META_PREDICTED_PRICE_COLUMN, PREDICTED_PRICE_COLUMN, REAL_PRICE_COLUMN,
};
use std::fs::{self, File};
use std::path::Path;

/// Cell spellings treated as a missing value (`.` is how FRED marks holidays).
const MISSING_MARKERS: [&str; 6] = ["", "NA", "NaN", "nan", "null", "."];

pub struct CsvStorage;

impl CsvStorage {
    /// Reads a date-keyed numeric table.
    ///
    /// Format: a header row, a date column (`YYYY-MM-DD`, optionally with a
    /// time part), and numeric columns. Missing cells become `NaN`.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, the date column or a selected
    /// column is absent, a date or number fails to parse, or a date repeats
    pub fn read_table(
        path: impl AsRef<Path>,
        date_column: &str,
        selection: &ColumnSelection,
    ) -> Result<TimeSeriesTable> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
            .clone();

        let date_idx = headers
            .iter()
            .position(|h| h == date_column)
            .ok_or_else(|| {
                ForecastError::invalid_input(format!(
                    "{}: missing date column '{}'",
                    path.display(),
                    date_column
                ))
            })?;

        let selected = resolve_selection(&headers, date_idx, selection)
            .with_context(|| format!("Invalid column selection for {}", path.display()))?;
        let columns: Vec<String> = selected.iter().map(|&i| headers[i].to_string()).collect();

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            // header is line 1
            let line = line + 2;
            let record =
                result.with_context(|| format!("{}: failed to read line {}", path.display(), line))?;

            let date = parse_date(&record[date_idx]).ok_or_else(|| {
                ForecastError::invalid_input(format!(
                    "{}: line {}: unparsable date '{}'",
                    path.display(),
                    line,
                    &record[date_idx]
                ))
            })?;

            let mut values = Vec::with_capacity(selected.len());
            for (&idx, column) in selected.iter().zip(&columns) {
                let cell = record.get(idx).unwrap_or("");
                let value = parse_cell(cell).ok_or_else(|| {
                    ForecastError::invalid_input(format!(
                        "{}: line {}: column '{}' has non-numeric value '{}'",
                        path.display(),
                        line,
                        column,
                        cell
                    ))
                })?;
                values.push(value);
            }
            rows.push((date, values));
        }

        let table = TimeSeriesTable::from_rows(columns, rows)
            .with_context(|| format!("Invalid table in {}", path.display()))?;

        tracing::debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.columns().len(),
            path.display()
        );

        Ok(table)
    }

    /// Writes evaluation results.
    ///
    /// Format: Date,Real Price,Predicted Price
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_predictions(path: impl AsRef<Path>, records: &[PredictionRecord]) -> Result<()> {
        let path = path.as_ref();
        let mut writer = create_writer(path)?;

        if records.is_empty() {
            writer.write_record([DATE_COLUMN, REAL_PRICE_COLUMN, PREDICTED_PRICE_COLUMN])?;
        }
        for record in records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Writes stacked evaluation results.
    ///
    /// Format: Date,Real Price,Meta Predicted Price,<base> Predicted Price...
    ///
    /// # Errors
    /// Returns error if file cannot be created, a record has the wrong number
    /// of base predictions, or writing fails
    pub fn write_stacking(
        path: impl AsRef<Path>,
        base_names: &[String],
        records: &[StackingRecord],
    ) -> Result<()> {
        let path = path.as_ref();
        let mut writer = create_writer(path)?;

        let mut header = vec![
            DATE_COLUMN.to_string(),
            REAL_PRICE_COLUMN.to_string(),
            META_PREDICTED_PRICE_COLUMN.to_string(),
        ];
        header.extend(
            base_names
                .iter()
                .map(|name| format!("{name} {PREDICTED_PRICE_COLUMN}")),
        );
        writer.write_record(&header)?;

        for record in records {
            if record.base_prices.len() != base_names.len() {
                anyhow::bail!(
                    "Stacking record for {} has {} base predictions, expected {}",
                    record.date,
                    record.base_prices.len(),
                    base_names.len()
                );
            }
            let mut row = vec![
                record.date.format("%Y-%m-%d").to_string(),
                record.real_price.to_string(),
                record.meta_price.to_string(),
            ];
            row.extend(record.base_prices.iter().map(ToString::to_string));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn create_writer(path: &Path) -> Result<Writer<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    Ok(Writer::from_writer(file))
}

fn resolve_selection(
    headers: &csv::StringRecord,
    date_idx: usize,
    selection: &ColumnSelection,
) -> Result<Vec<usize>> {
    let selected: Vec<usize> = match selection {
        ColumnSelection::All => (0..headers.len()).filter(|&i| i != date_idx).collect(),
        ColumnSelection::Names(names) => names
            .iter()
            .map(|name| {
                headers.iter().position(|h| h == name.as_str()).ok_or_else(|| {
                    ForecastError::invalid_input(format!("missing required column '{name}'"))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        ColumnSelection::Indices(indices) => {
            if let Some(&bad) = indices.iter().find(|&&i| i >= headers.len()) {
                return Err(ForecastError::invalid_input(format!(
                    "column index {} out of range for {} columns",
                    bad,
                    headers.len()
                ))
                .into());
            }
            indices.iter().copied().filter(|&i| i != date_idx).collect()
        }
    };
    Ok(selected)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn parse_cell(raw: &str) -> Option<f64> {
    if MISSING_MARKERS.contains(&raw) {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}
