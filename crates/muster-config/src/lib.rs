//! Configuration system for Muster.
//!
//! Load planner configuration from TOML files to control budgets, value
//! accounting, and runtime limits without code changes.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use muster_config::PlannerConfig;
//! use std::time::Duration;
//!
//! let config = PlannerConfig::from_toml_str(r#"
//!     [budget]
//!     turns = 25
//!
//!     [accounting]
//!     count_captured_cost = true
//!
//!     [limits]
//!     time_limit_ms = 50
//! "#).unwrap();
//!
//! assert_eq!(config.budget.turns, 25);
//! assert_eq!(config.time_limit(), Some(Duration::from_millis(50)));
//! ```
//!
//! Use the default config when the file is missing:
//!
//! ```
//! use muster_config::PlannerConfig;
//!
//! let config = PlannerConfig::load("planner.toml").unwrap_or_default();
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main planner configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    /// Turn budget settings.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Value accounting settings.
    #[serde(default)]
    pub accounting: AccountingConfig,

    /// Runtime limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl PlannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Sets the turn budget.
    pub fn with_turns(mut self, turns: u32) -> Self {
        self.budget.turns = turns;
        self
    }

    /// Sets the soft time limit in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.limits.time_limit_ms = Some(ms);
        self
    }

    /// Enables or disables fast mode.
    pub fn with_fast_mode(mut self, fast: bool) -> Self {
        self.limits.fast_mode = fast;
        self
    }

    /// Returns the soft time limit, if configured.
    pub fn time_limit(&self) -> Option<Duration> {
        self.limits.time_limit_ms.map(Duration::from_millis)
    }
}

/// Turn budget settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetConfig {
    /// Maximum moves a plan may consume.
    #[serde(default = "default_turns")]
    pub turns: u32,
}

fn default_turns() -> u32 {
    25
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            turns: default_turns(),
        }
    }
}

/// Value accounting settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountingConfig {
    /// Count the true cost of captured hostile tiles in the gathered total
    /// instead of friendly force only.
    #[serde(default)]
    pub count_captured_cost: bool,

    /// Permit grafts that gather negative value (defense scenarios).
    #[serde(default)]
    pub allow_negative: bool,
}

/// Runtime limits.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Soft wall-clock cutoff in milliseconds; unbounded when absent.
    #[serde(default)]
    pub time_limit_ms: Option<u64>,

    /// Trade plan quality for speed in the iterative builder.
    #[serde(default)]
    pub fast_mode: bool,
}
