use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::AppError;
use crate::state::{DEFAULT_AMBIENT_CO2_BASELINE_PPM, DEFAULT_HISTORY_CAPACITY};

/// Environment variable naming the metrics feed URL; overrides the config file.
pub const METRICS_URL_ENV: &str = "PLANT_METRICS_URL";
/// Environment variable for the ambient CO2 baseline (ppm); overrides the config file.
pub const AMBIENT_BASELINE_ENV: &str = "AMBIENT_CO2_BASELINE_PPM";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub metrics: MetricsConfig,
    pub web: WebConfig,
    pub mock: MockConfig,
}

/// Metrics feed and history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// NDJSON stream endpoint
    pub url: String,
    /// Reference outdoor CO2 concentration (ppm)
    pub ambient_co2_baseline_ppm: f64,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_secs: f64,
    /// Maximum retained samples (ring buffer)
    pub history_capacity: usize,
    /// Bound of the sample channel between ingest and store tasks
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the local mock NDJSON generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    pub host: String,
    pub port: u16,
    pub interval_secs: f64,
    pub start_temp_c: f64,
    pub start_humidity_pct: f64,
    pub start_co2_ppm: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics: MetricsConfig {
                url: "http://127.0.0.1:9099/metrics/plant_stream".to_string(),
                ambient_co2_baseline_ppm: DEFAULT_AMBIENT_CO2_BASELINE_PPM,
                reconnect_delay_secs: 2.0,
                history_capacity: DEFAULT_HISTORY_CAPACITY,
                channel_capacity: 32,
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            mock: MockConfig {
                host: "127.0.0.1".to_string(),
                port: 9099,
                interval_secs: 2.0,
                start_temp_c: 28.14,
                start_humidity_pct: 36.95,
                start_co2_ppm: 590.0,
            },
        }
    }
}

impl Config {
    /// Load configuration from the file named by `CONFIG_FILE` (default
    /// `config.toml`), writing the defaults to disk on first run. Environment
    /// overrides are applied afterwards.
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        let mut config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read config file: {config_file}"))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {config_file}"))?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)
                .with_context(|| format!("Failed to write default config: {config_file}"))?;
            default_config
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the environment overrides owned by this service.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(METRICS_URL_ENV) {
            self.metrics.url = url;
        }
        if let Ok(baseline) = std::env::var(AMBIENT_BASELINE_ENV) {
            self.metrics.ambient_co2_baseline_ppm = baseline
                .parse()
                .with_context(|| format!("{AMBIENT_BASELINE_ENV} must be a number: {baseline}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        Url::parse(&self.metrics.url).map_err(|err| {
            AppError::configuration(format!("Invalid metrics URL {}: {}", self.metrics.url, err))
        })?;
        if self.metrics.history_capacity == 0 {
            return Err(AppError::configuration(
                "metrics.history_capacity must be at least 1",
            ));
        }
        if self.metrics.channel_capacity == 0 {
            return Err(AppError::configuration(
                "metrics.channel_capacity must be at least 1",
            ));
        }
        if self.metrics.reconnect_delay_secs <= 0.0 {
            return Err(AppError::configuration(
                "metrics.reconnect_delay_secs must be positive",
            ));
        }
        Ok(())
    }
}
