//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/adoptometer/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/adoptometer/` (~/.config/adoptometer/)
//! - Data: `$XDG_DATA_HOME/adoptometer/` (~/.local/share/adoptometer/)
//! - State/Logs: `$XDG_STATE_HOME/adoptometer/` (~/.local/state/adoptometer/)

use crate::error::{Error, Result};
use crate::types::YearMonth;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Aggregation windows and the sustained-user policy
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Command-category allow-lists
    #[serde(default)]
    pub categories: CategoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Aggregation windows and the sustained-user policy.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Earliest activity date considered by the pipeline
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Minimum activity span, in days, for a user to count as a genuine
    /// adopter. The comparison is **exclusive**: a user qualifies only if
    /// `last_seen - first_seen > sustained_threshold_days`. This is the
    /// adoption gate for every downstream metric; accounts seen only
    /// briefly (a single trial run, a CI bot, a throwaway demo) fall
    /// below it and are excluded everywhere.
    #[serde(default = "default_sustained_threshold_days")]
    pub sustained_threshold_days: i64,

    /// Earliest month reported by `new_users_monthly` (inclusive)
    #[serde(default = "default_new_user_floor_month")]
    pub new_user_floor_month: YearMonth,

    /// Earliest month reported by `mau_monthly` (inclusive)
    #[serde(default = "default_mau_floor_month")]
    pub mau_floor_month: YearMonth,

    /// Earliest invocation date considered by the command-category
    /// metrics (inclusive)
    #[serde(default = "default_command_floor_date")]
    pub command_floor_date: NaiveDate,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            sustained_threshold_days: default_sustained_threshold_days(),
            new_user_floor_month: default_new_user_floor_month(),
            mau_floor_month: default_mau_floor_month(),
            command_floor_date: default_command_floor_date(),
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
}

fn default_sustained_threshold_days() -> i64 {
    8
}

fn default_new_user_floor_month() -> YearMonth {
    YearMonth {
        year: 2024,
        month: 11,
    }
}

fn default_mau_floor_month() -> YearMonth {
    YearMonth {
        year: 2024,
        month: 10,
    }
}

fn default_command_floor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
}

/// Command-category allow-lists.
///
/// A command is classified by its first two whitespace-delimited tokens
/// (e.g., "kedro mlflow"). The two lists must be disjoint; the defaults
/// are the kedro plugin and core-command sets the telemetry was first
/// built for.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// Labels counted in `plugin_category_mau`
    #[serde(default = "default_plugin_categories")]
    pub plugin_categories: Vec<String>,

    /// Labels counted in `core_category_mau`
    #[serde(default = "default_core_categories")]
    pub core_categories: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            plugin_categories: default_plugin_categories(),
            core_categories: default_core_categories(),
        }
    }
}

fn default_plugin_categories() -> Vec<String> {
    [
        "kedro mlflow",
        "kedro docker",
        "kedro airflow",
        "kedro databricks",
        "kedro azureml",
        "kedro vertexai",
        "kedro gql",
        "kedro boot",
        "kedro sagemaker",
        "kedro coda",
        "kedro kubeflow",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_core_categories() -> Vec<String> {
    [
        "kedro run",
        "kedro viz",
        "kedro new",
        "kedro pipeline",
        "kedro jupyter",
        "kedro ipython",
        "kedro package",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Validate configuration, returning an error before any query runs.
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.sustained_threshold_days < 0 {
            return Err(Error::Config(format!(
                "aggregation.sustained_threshold_days must not be negative, got {}",
                self.aggregation.sustained_threshold_days
            )));
        }

        for label in self
            .categories
            .plugin_categories
            .iter()
            .chain(&self.categories.core_categories)
        {
            if label.trim().is_empty() {
                return Err(Error::Config(
                    "category allow-lists must not contain empty labels".to_string(),
                ));
            }
        }

        if let Some(shared) = self
            .categories
            .plugin_categories
            .iter()
            .find(|label| self.categories.core_categories.contains(label))
        {
            return Err(Error::Config(format!(
                "category {:?} appears in both plugin_categories and core_categories",
                shared
            )));
        }

        Ok(())
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/adoptometer/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("adoptometer").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite event store)
    ///
    /// `$XDG_DATA_HOME/adoptometer/`
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("adoptometer")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/adoptometer/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("adoptometer")
    }

    /// Returns the event store file path
    ///
    /// `$XDG_DATA_HOME/adoptometer/events.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("events.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/adoptometer/adoptometer.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("adoptometer.log")
    }
}
