//! Estimator service configuration

use anyhow::{bail, Context, Result};
use estimator_lib::forecast::{
    ForecastConfig, DEFAULT_MAX_AR_ORDER, DEFAULT_MAX_FORECAST_STEPS,
    DEFAULT_MAX_HISTORY_POINTS, DEFAULT_MAX_HORIZON_MINUTES,
};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "ESTIMATOR_CONFIG_FILE";

/// Prefix for environment overrides, e.g. `ESTIMATOR_API_PORT`
pub const ENV_PREFIX: &str = "ESTIMATOR";

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatorConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_api_host")]
    pub api_host: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Longest accepted prediction horizon
    #[serde(default = "default_max_horizon_minutes")]
    pub max_horizon_minutes: u32,

    /// History beyond this many samples is truncated to the most recent ones
    #[serde(default = "default_max_history_points")]
    pub max_history_points: usize,

    #[serde(default = "default_max_forecast_steps")]
    pub max_forecast_steps: usize,

    #[serde(default = "default_max_ar_order")]
    pub max_ar_order: usize,

    /// Used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "cost-estimator".to_string())
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8001
}

fn default_max_horizon_minutes() -> u32 {
    DEFAULT_MAX_HORIZON_MINUTES
}

fn default_max_history_points() -> usize {
    DEFAULT_MAX_HISTORY_POINTS
}

fn default_max_forecast_steps() -> usize {
    DEFAULT_MAX_FORECAST_STEPS
}

fn default_max_ar_order() -> usize {
    DEFAULT_MAX_AR_ORDER
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EstimatorConfig {
    /// Load from the file named by `ESTIMATOR_CONFIG_FILE` (if any) and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok();
        Self::load_from(file.as_deref().map(Path::new))
    }

    /// Load from an optional file, with `ESTIMATOR_*` variables taking precedence
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read estimator configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid estimator configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_horizon_minutes == 0 {
            bail!("max_horizon_minutes must be positive");
        }
        if self.max_forecast_steps == 0 {
            bail!("max_forecast_steps must be positive");
        }
        if self.max_history_points < 3 {
            bail!("max_history_points must be at least 3");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            max_horizon_minutes: self.max_horizon_minutes,
            max_history_points: self.max_history_points,
            max_forecast_steps: self.max_forecast_steps,
            max_ar_order: self.max_ar_order,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_host: default_api_host(),
            api_port: default_api_port(),
            max_horizon_minutes: default_max_horizon_minutes(),
            max_history_points: default_max_history_points(),
            max_forecast_steps: default_max_forecast_steps(),
            max_ar_order: default_max_ar_order(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EstimatorConfig::default();
        assert_eq!(config.api_port, 8001);
        assert_eq!(config.max_horizon_minutes, 240);
        assert_eq!(config.listen_addr(), "0.0.0.0:8001");
        assert_eq!(config.forecast_config().max_ar_order, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "api_port = 9100\nmax_horizon_minutes = 60\nlog_level = \"debug\"").unwrap();

        let config = EstimatorConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.max_horizon_minutes, 60);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_forecast_steps, DEFAULT_MAX_FORECAST_STEPS);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "max_horizon_minutes = 0").unwrap();
        assert!(EstimatorConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = EstimatorConfig::load_from(Some(Path::new("/nonexistent/estimator.toml")));
        assert!(result.is_err());
    }
}
