use crate::driver::{
    DEFAULT_COMPLETION_THRESHOLD, DEFAULT_INTERVAL, DEFAULT_STEP, DriverConfig,
};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "OPSUITE_CONFIG_PATH";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverSettings {
    pub interval_ms: u64,
    pub step: u8,
    pub completion_threshold: u8,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            step: DEFAULT_STEP,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
        }
    }
}

impl DriverSettings {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            interval: Duration::from_millis(self.interval_ms),
            step: self.step,
            completion_threshold: self.completion_threshold,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub driver: DriverSettings,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub interval_ms: Option<u64>,
    pub step: Option<u8>,
    pub completion_threshold: Option<u8>,
    pub log_filter: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("opsuite").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("opsuite")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

/// Keeps the driver able to make progress: a zero step would stall a task forever.
fn normalize_config(mut config: Config) -> Config {
    config.driver = normalize_driver(config.driver);
    config.log_filter = config
        .log_filter
        .map(|filter| filter.trim().to_string())
        .filter(|filter| !filter.is_empty());
    config
}

fn normalize_driver(mut driver: DriverSettings) -> DriverSettings {
    if driver.step == 0 {
        driver.step = DEFAULT_STEP;
    }
    driver.step = driver.step.min(100);
    driver.completion_threshold = driver.completion_threshold.min(100);
    driver
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(interval_ms) = overrides.interval_ms {
        merged.driver.interval_ms = interval_ms;
    }
    if let Some(step) = overrides.step {
        merged.driver.step = step;
    }
    if let Some(threshold) = overrides.completion_threshold {
        merged.driver.completion_threshold = threshold;
    }
    if let Some(filter) = overrides.log_filter.as_ref() {
        merged.log_filter = Some(filter.clone());
    }

    normalize_config(merged)
}
