//! Configuration module for the decision pipeline

use crate::pipeline::ReporterKind;
use crate::portfolio::Portfolio;
use crate::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// Pipeline configuration
    pub pipeline: PipelineConfig,

    /// Input data locations
    pub data: DataConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Holdings used when a snapshot carries none. Only an explicit
    /// `[portfolio]` table enables the fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<PortfolioConfig>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ticker evaluated when none is given on the command line
    pub ticker: String,

    /// Print every stage's reasoning to the console
    #[serde(default)]
    pub show_reasoning: bool,

    /// Reporter used when `show_reasoning` is off
    #[serde(default)]
    pub reporter: ReporterKind,
}

/// Input data locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding `<TICKER>.json` snapshots
    pub data_dir: String,

    /// Optional OHLCV CSV that replaces the snapshot's prices
    #[serde(default)]
    pub prices_csv: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "hedgefund=debug"
    pub level: String,
}

/// Fallback holdings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Starting cash
    pub cash: f64,

    /// Shares already held
    pub stock: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            pipeline: PipelineConfig::default(),
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
            portfolio: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { ticker: "AAPL".to_string(), show_reasoning: false, reporter: ReporterKind::Log }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_dir: "data".to_string(), prices_csv: None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl PortfolioConfig {
    pub fn to_portfolio(&self) -> Portfolio {
        Portfolio::new(self.cash, self.stock)
    }
}

impl PipelineConfig {
    /// `show_reasoning` forces the console reporter.
    pub fn reporter_kind(&self) -> ReporterKind {
        if self.show_reasoning {
            ReporterKind::Console
        } else {
            self.reporter
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        | "1" | "true" | "yes" | "on" => Some(true),
        | "0" | "false" | "no" | "off" => Some(false),
        | _ => None,
    }
}

impl Config {
    /// Holdings to assume when a snapshot has none, if configured.
    pub fn fallback_portfolio(&self) -> Option<Portfolio> {
        self.portfolio.as_ref().map(PortfolioConfig::to_portfolio)
    }

    /// Serialize default config to TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError("Config version must be set (e.g., '0.1.0')".to_string()));
        }
        if self.pipeline.ticker.trim().is_empty() {
            return Err(Error::ConfigError("pipeline.ticker must be set".to_string()));
        }
        if self.data.data_dir.trim().is_empty() {
            return Err(Error::ConfigError("data.data_dir must be set".to_string()));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(Error::ConfigError(format!(
                "logging.level '{}' is not a valid filter",
                self.logging.level
            )));
        }
        if let Some(portfolio) = &self.portfolio {
            if !portfolio.cash.is_finite() || portfolio.cash < 0.0 {
                return Err(Error::ConfigError("portfolio.cash must be a non-negative number".to_string()));
            }
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        // Try to load from current directory
        if let Ok(config) = Self::from_file("config.toml") {
            return Ok(config);
        }

        // Try to load from user config directory
        if let Some(mut path) = dirs::config_dir() {
            path.push("hedgefund");
            path.push("config.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return default config if no config file found
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(ticker) = env::var("HEDGEFUND_TICKER") {
            self.pipeline.ticker = ticker;
        }

        if let Ok(dir) = env::var("HEDGEFUND_DATA_DIR") {
            self.data.data_dir = dir;
        }

        if let Ok(flag) = env::var("HEDGEFUND_SHOW_REASONING") {
            self.pipeline.show_reasoning = parse_bool(&flag).ok_or_else(|| {
                Error::ConfigError(format!("HEDGEFUND_SHOW_REASONING must be a boolean, got '{}'", flag))
            })?;
        }

        if let Ok(level) = env::var(crate::utils::logging::LOG_ENV) {
            self.logging.level = level;
        }

        Ok(())
    }
}
