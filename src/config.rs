//! Application configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::CrewdeskError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Postgres connection string.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Initial delay before the change listener reconnects; doubles on
    /// repeated failures.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: Duration,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    /// Records per list page.
    pub page_size: usize,
    /// Day buckets in the application trend chart.
    pub trend_days: u32,
    /// Month buckets in the application trend chart.
    pub trend_months: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            trend_days: 7,
            trend_months: 6,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("CREWDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl StoreConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CrewdeskError> {
        if self.url.trim().is_empty() {
            return Err(CrewdeskError::ConfigurationError {
                message: "Store url cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(CrewdeskError::ConfigurationError {
                message: "Store pool needs at least one connection".to_string(),
            });
        }
        if self.reconnect_delay.is_zero() {
            return Err(CrewdeskError::ConfigurationError {
                message: "Reconnect delay must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl ViewConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CrewdeskError> {
        if self.page_size == 0 {
            return Err(CrewdeskError::ConfigurationError {
                message: "Page size must be greater than zero".to_string(),
            });
        }
        if self.trend_days == 0 || self.trend_months == 0 {
            return Err(CrewdeskError::ConfigurationError {
                message: "Trend charts need at least one bucket".to_string(),
            });
        }
        Ok(())
    }
}
