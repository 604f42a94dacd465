//! Data loading and result storage for the price-forecast workspace.
//!
//! This crate provides:
//! - CSV reading of date-keyed numeric tables with column selection
//! - Source merging for the forecast run and base-result joining for stacking
//! - CSV and JSON writers for run outputs

pub mod csv_storage;
pub mod json_storage;
pub mod sources;

pub use csv_storage::CsvStorage;
pub use json_storage::JsonStorage;
pub use sources::{load_base_results, load_sources};
