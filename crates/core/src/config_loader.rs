use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering built-in defaults, a TOML file, and
    /// `FORECAST_`-prefixed environment variables (`__` separates nesting,
    /// e.g. `FORECAST_FORECAST__WINDOW_SIZE=30`).
    ///
    /// A missing TOML file is not an error; defaults and the environment
    /// still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Self::base()
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Loads configuration with a profile overlay read from the sibling file
    /// `<stem>.<profile>.toml` (e.g. `config/Config.aapl.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Self::base()
            .merge(Toml::file(path))
            .merge(Toml::file(profile_path(path, profile)))
            .merge(Self::env())
            .extract()?;

        tracing::debug!(
            "Loaded configuration from {} with profile '{}'",
            path.display(),
            profile
        );
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    fn env() -> Env {
        Env::prefixed("FORECAST_").split("__")
    }
}

fn profile_path(path: &Path, profile: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "Config".into(), |s| s.to_string_lossy());
    path.with_file_name(format!("{stem}.{profile}.toml"))
}
