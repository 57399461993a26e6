//! Configuration management for ledgerlens
//!
//! This module handles loading, validation, and management of
//! ledgerlens configuration from YAML files, plus the read-only
//! ledger settings served by the statement API.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Statement API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the statement API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Root names of the account hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default = "default_income")]
    pub income: String,
    /// Expense root, also used as the prefix for the total sign flip
    #[serde(default = "default_expenses")]
    pub expenses: String,
    #[serde(default = "default_assets")]
    pub assets: String,
    #[serde(default = "default_liabilities")]
    pub liabilities: String,
    #[serde(default = "default_equity")]
    pub equity: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            income: default_income(),
            expenses: default_expenses(),
            assets: default_assets(),
            liabilities: default_liabilities(),
            equity: default_equity(),
        }
    }
}

fn default_income() -> String {
    "income".to_string()
}

fn default_expenses() -> String {
    "expenses".to_string()
}

fn default_assets() -> String {
    "assets".to_string()
}

fn default_liabilities() -> String {
    "liabilities".to_string()
}

fn default_equity() -> String {
    "equity".to_string()
}

/// Locale and currency used for labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// BCP 47 locale tag, e.g. "en-US"
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Reporting currency expected from the API; the first response in
    /// another currency is flagged as a currency change
    #[serde(default = "default_currency")]
    pub base_currency: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            base_currency: default_currency(),
        }
    }
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Chart and visualization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Color palette slots, assigned by position
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    /// How account colors survive drill transitions
    #[serde(default)]
    pub color_strategy: ColorStrategy,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            color_strategy: ColorStrategy::Positional,
        }
    }
}

fn default_palette() -> Vec<String> {
    (1..=5).map(|i| format!("var(--chart-{})", i)).collect()
}

/// Color assignment strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorStrategy {
    /// The i-th account of the current series gets slot `i mod len`
    Positional,
    /// Accounts keep the slot they were first given for the lifetime of the view
    Sticky,
}

impl Default for ColorStrategy {
    fn default() -> Self {
        ColorStrategy::Positional
    }
}

impl std::str::FromStr for ColorStrategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positional" => Ok(ColorStrategy::Positional),
            "sticky" => Ok(ColorStrategy::Sticky),
            _ => Err(format!("Invalid color strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for ColorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorStrategy::Positional => write!(f, "positional"),
            ColorStrategy::Sticky => write!(f, "sticky"),
        }
    }
}

/// Flow diagram sizing constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SankeyConfig {
    /// Width added per chain step
    #[serde(default = "default_unit_width")]
    pub unit_width: u32,
    /// Height added per source/target node
    #[serde(default = "default_unit_height")]
    pub unit_height: u32,
    /// Lower bound of the canvas height
    #[serde(default = "default_min_height")]
    pub min_height: u32,
    /// Extra width per node on the widest side
    #[serde(default = "default_per_node_padding")]
    pub per_node_padding: u32,
}

impl Default for SankeyConfig {
    fn default() -> Self {
        Self {
            unit_width: default_unit_width(),
            unit_height: default_unit_height(),
            min_height: default_min_height(),
            per_node_padding: default_per_node_padding(),
        }
    }
}

fn default_unit_width() -> u32 {
    100
}

fn default_unit_height() -> u32 {
    75
}

fn default_min_height() -> u32 {
    500
}

fn default_per_node_padding() -> u32 {
    15
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
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

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Statement API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Account hierarchy roots
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Locale and currency
    #[serde(default)]
    pub display: DisplayConfig,
    /// Chart settings
    #[serde(default)]
    pub charts: ChartConfig,
    /// Flow diagram sizing
    #[serde(default)]
    pub sankey: SankeyConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::IoError)?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::InvalidYaml { message: e.to_string() })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "api.base_url".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if self.accounts.expenses.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "accounts.expenses".to_string(),
            });
        }

        if self.charts.palette.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "charts.palette".to_string(),
                reason: "Palette must contain at least one color".to_string(),
            });
        }

        let sankey = &self.sankey;
        if sankey.unit_width == 0 || sankey.unit_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sankey".to_string(),
                reason: "unit_width and unit_height must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Overlay the settings reported by the statement API.
    ///
    /// Empty remote values leave the local value in place.
    pub fn apply_ledger_settings(&mut self, settings: &LedgerSettings) {
        fn overlay(target: &mut String, value: &str) {
            if !value.trim().is_empty() {
                *target = value.to_string();
            }
        }

        overlay(&mut self.display.base_currency, &settings.base_currency);
        overlay(&mut self.display.locale, &settings.locale);
        overlay(&mut self.accounts.income, &settings.accounts.income_account);
        overlay(&mut self.accounts.expenses, &settings.accounts.expense_account);
        overlay(&mut self.accounts.assets, &settings.accounts.assets_account);
        overlay(&mut self.accounts.liabilities, &settings.accounts.liabilities_account);
        overlay(&mut self.accounts.equity, &settings.accounts.equity_account);
    }
}

// ==================== Remote Ledger Settings ====================

/// Account names as reported by the config endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LedgerAccounts {
    pub conversion_account: String,
    #[serde(rename = "FXGainAccount")]
    pub fx_gain_account: String,
    #[serde(rename = "FXLossAccount")]
    pub fx_loss_account: String,
    pub income_account: String,
    pub expense_account: String,
    pub assets_account: String,
    pub liabilities_account: String,
    pub equity_account: String,
}

/// Read-only settings served by `/api/getConfig/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LedgerSettings {
    pub base_currency: String,
    pub locale: String,
    pub accounts: LedgerAccounts,
}
