//! Assembles the analysis tables from configured input files.

use crate::csv_storage::CsvStorage;
use anyhow::{Context, Result};
use forecast_core::{
    BaseResultConfig, ColumnSelection, SourceConfig, TimeSeriesTable, PREDICTED_PRICE_COLUMN,
    REAL_PRICE_COLUMN,
};

/// Loads every source, outer-merges them on date (earlier sources win where
/// they overlap), and drops rows with any missing value.
///
/// # Errors
/// Returns error if no source is configured, a file fails to load, or no
/// complete row survives the merge
pub fn load_sources(sources: &[SourceConfig], date_column: &str) -> Result<TimeSeriesTable> {
    let mut merged: Option<TimeSeriesTable> = None;

    for source in sources {
        let table = CsvStorage::read_table(&source.path, date_column, &source.selection())
            .with_context(|| format!("Failed to load source {}", source.path.display()))?;

        tracing::info!(
            "Loaded {} rows ({}) from {}",
            table.len(),
            table.columns().join(", "),
            source.path.display()
        );

        merged = Some(match merged {
            Some(acc) => acc.combine_first(&table),
            None => table,
        });
    }

    let merged = merged.ok_or_else(|| anyhow::anyhow!("No input sources configured"))?;
    let cleaned = merged.drop_missing();
    let dropped = merged.len() - cleaned.len();

    if dropped > 0 {
        tracing::info!(
            "Dropped {} of {} merged rows with missing values",
            dropped,
            merged.len()
        );
    }
    if cleaned.is_empty() {
        anyhow::bail!(
            "No complete rows remain after merging {} source(s)",
            sources.len()
        );
    }

    Ok(cleaned)
}

/// Loads upstream forecast results and inner-joins them on date.
///
/// The result has a `Real Price` column taken from the first base result,
/// followed by one column per base model holding its `Predicted Price`,
/// named after the base.
///
/// # Errors
/// Returns error if no base result is configured, a file fails to load, or
/// the join leaves no complete row
pub fn load_base_results(
    bases: &[BaseResultConfig],
    date_column: &str,
) -> Result<TimeSeriesTable> {
    let mut joined: Option<TimeSeriesTable> = None;

    for base in bases {
        let path = &base.path;
        joined = Some(match joined {
            None => CsvStorage::read_table(
                path,
                date_column,
                &ColumnSelection::Names(vec![
                    REAL_PRICE_COLUMN.to_string(),
                    PREDICTED_PRICE_COLUMN.to_string(),
                ]),
            )
            .and_then(|t| Ok(t.renamed(&[REAL_PRICE_COLUMN, base.name.as_str()])?))
            .with_context(|| format!("Failed to load base result {}", path.display()))?,
            Some(acc) => {
                let table = CsvStorage::read_table(
                    path,
                    date_column,
                    &ColumnSelection::Names(vec![PREDICTED_PRICE_COLUMN.to_string()]),
                )
                .and_then(|t| Ok(t.renamed(&[base.name.as_str()])?))
                .with_context(|| format!("Failed to load base result {}", path.display()))?;
                acc.inner_join(&table)?
            }
        });
    }

    let joined = joined.ok_or_else(|| anyhow::anyhow!("No base results configured"))?;
    let cleaned = joined.drop_missing();

    tracing::info!(
        "Joined {} base result(s) over {} shared dates",
        bases.len(),
        cleaned.len()
    );

    if cleaned.is_empty() {
        anyhow::bail!("Base results share no complete dates");
    }

    Ok(cleaned)
}
