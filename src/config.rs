//! Application configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file,
//! then `NOAA_WEATHER__SECTION__KEY` environment variables. CLI flags are
//! applied on top by the caller.

use crate::error::Result;
use crate::models::DegreeDayThresholds;
use crate::utils::constants::{
    DEFAULT_CONCURRENT_DOWNLOADS, DEFAULT_HISTORY_MAX_AGE_DAYS, DEFAULT_NOAA_BASE_URL,
    DEFAULT_RESULTS_DIR, DEFAULT_SUPPORT_DIR, DEFAULT_TIMEOUT_SECS, DEFAULT_TMY_INDEX_URL,
    DEFAULT_WEATHER_DIR, ENV_PREFIX, EPW_TEMPLATE_FILE, ERRORS_FILE, ISD_HISTORY_FILE, TMY_DIR,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Station history, EPW template and the error log.
    pub support_dir: PathBuf,
    /// Downloaded raw files, `<source>/<year>/`.
    pub weather_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            support_dir: PathBuf::from(DEFAULT_SUPPORT_DIR),
            weather_dir: PathBuf::from(DEFAULT_WEATHER_DIR),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl PathsConfig {
    pub fn new(support_dir: impl Into<PathBuf>, weather_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            support_dir: support_dir.into(),
            weather_dir: weather_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn isd_history_path(&self) -> PathBuf {
        self.support_dir.join(ISD_HISTORY_FILE)
    }

    pub fn epw_template_path(&self) -> PathBuf {
        self.support_dir.join(EPW_TEMPLATE_FILE)
    }

    pub fn errors_log_path(&self) -> PathBuf {
        self.support_dir.join(ERRORS_FILE)
    }

    pub fn tmy_dir(&self) -> PathBuf {
        self.weather_dir.join(TMY_DIR)
    }

    /// Create every directory; existing ones are left alone.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.support_dir, &self.weather_dir, &self.results_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NetworkConfig {
    #[validate(url)]
    pub base_url: String,

    #[validate(url)]
    pub tmy_index_url: String,

    #[validate(range(min = 1, max = 3600))]
    pub timeout_secs: u64,

    pub history_max_age_days: u64,

    #[validate(range(min = 1, max = 64))]
    pub concurrent_downloads: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOAA_BASE_URL.to_string(),
            tmy_index_url: DEFAULT_TMY_INDEX_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            history_max_age_days: DEFAULT_HISTORY_MAX_AGE_DAYS,
            concurrent_downloads: DEFAULT_CONCURRENT_DOWNLOADS,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn history_max_age(&self) -> Duration {
        Duration::from_secs(self.history_max_age_days * 24 * 60 * 60)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,

    #[validate(nested)]
    pub network: NetworkConfig,

    #[validate(nested)]
    pub degree_days: DegreeDayThresholds,
}

impl AppConfig {
    /// Layer defaults, `file` (when given) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = file {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}
