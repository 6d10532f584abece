use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::{
    domain::{CurrencyCode, ReservedCategories},
    ledger::DEFAULT_ADVANCE_LIMIT,
    utils::{
        app_data_dir, config_dir_in, config_file_in, data_dir_in, ensure_dir, tmp_path,
        write_atomic, DEFAULT_LOG_FILTER,
    },
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("config file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the JSON tables live; defaults to `<app dir>/data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub log_filter: String,
    pub base_currency: CurrencyCode,
    pub max_schedule_advances: usize,
    pub reminder_window_days: u32,
    pub reserved_categories: ReservedCategories,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
            base_currency: CurrencyCode::default(),
            max_schedule_advances: DEFAULT_ADVANCE_LIMIT,
            reminder_window_days: 7,
            reserved_categories: ReservedCategories::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_schedule_advances == 0 {
            return Err(ConfigError::Invalid(
                "max_schedule_advances must be at least 1".into(),
            ));
        }
        if EnvFilter::try_new(&self.log_filter).is_err() {
            return Err(ConfigError::Invalid(format!(
                "log_filter `{}` is not a valid filter directive",
                self.log_filter
            )));
        }
        let reserved = self.reserved_categories;
        if reserved.transfer_in == reserved.transfer_out {
            return Err(ConfigError::Invalid(
                "transfer categories must be distinct".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the table directory against `base` when none is configured.
    pub fn data_dir_or(&self, base: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| data_dir_in(base))
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        ensure_dir(&base)?;
        ensure_dir(&config_dir_in(&base))?;
        Ok(Self {
            path: config_file_in(&base),
            base,
        })
    }

    /// Reads the config file, falling back to defaults when it is missing.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config = if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}
