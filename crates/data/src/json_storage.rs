use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

pub struct JsonStorage;

impl JsonStorage {
    /// Writes any serializable report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or serialization fails
    pub fn write<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)
            .with_context(|| format!("Failed to write JSON report: {}", path.display()))?;
        Ok(())
    }
}
