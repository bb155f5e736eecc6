//! Configuration for the KPI dashboard.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! `./supply_kpi.toml` -> explicit file -> `SUPPLY_KPI_` environment variables.

use crate::data::{CsvDialect, SchemaConfig};
use crate::stats::Granularity;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCAL_CONFIG_FILE: &str = "supply_kpi.toml";
pub const ENV_PREFIX: &str = "SUPPLY_KPI_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("CSV {what} must be a single ASCII character other than a line break, got {value:?}")]
    InvalidDialect { what: &'static str, value: char },
    #[error("CSV delimiter and quote must differ")]
    DelimiterIsQuote,
    #[error("Configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub csv: CsvConfig,
    pub schema: SchemaConfig,
    pub report: ReportConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: char,
    pub quote: char,
}

impl Default for CsvConfig {
    fn default() -> Self {
        let dialect = CsvDialect::default();
        Self {
            delimiter: dialect.delimiter,
            quote: dialect.quote,
        }
    }
}

impl CsvConfig {
    pub fn dialect(&self) -> Result<CsvDialect, ConfigError> {
        for (what, value) in [("delimiter", self.delimiter), ("quote", self.quote)] {
            if !value.is_ascii() || value == '\n' || value == '\r' {
                return Err(ConfigError::InvalidDialect { what, value });
            }
        }
        if self.delimiter == self.quote {
            return Err(ConfigError::DelimiterIsQuote);
        }
        Ok(CsvDialect {
            delimiter: self.delimiter,
            quote: self.quote,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file; relative paths resolve against the data directory.
    pub path: PathBuf,
    /// Persist every successfully validated upload.
    pub save_on_load: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: PathBuf::from("shipments.sqlite3"),
            save_on_load: false,
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        if self.path.is_absolute() {
            return self.path.clone();
        }
        match project_dirs() {
            Some(dirs) => dirs.data_dir().join(&self.path),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Also write JSON logs to the data directory.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "supply-kpi", "supply_kpi")
}

/// Load configuration from all layers.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`SUPPLY_KPI_STORE__BACKEND=sqlite`, ...)
/// 2. Explicit config file
/// 3. Working-directory `supply_kpi.toml`
/// 4. User config (`<config dir>/config.toml`)
/// 5. Built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    let local = Path::new(LOCAL_CONFIG_FILE);
    if local.exists() {
        figment = figment.merge(Toml::file(local));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: AppConfig = figment.extract().map_err(Box::new)?;
    config.csv.dialect()?;
    Ok(config)
}
