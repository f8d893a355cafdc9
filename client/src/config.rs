use common::config::{ConfigManager, FileContentConfigProvider, Validate, YamlConfigSerializer, validate_range};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tick_clock::DEFAULT_TICK_INTERVAL;

pub const DEFAULT_CONFIG_FILE: &str = "snake_client_config.yaml";

pub fn get_config_manager(
    path: &str,
) -> ConfigManager<FileContentConfigProvider, Config, YamlConfigSerializer> {
    ConfigManager::from_yaml_file(path)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub timing: TimingConfig,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.timing.validate()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                address: "http://[::1]:5001".to_string(),
            },
            timing: TimingConfig {
                tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
                frame_interval_ms: 16,
            },
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub address: String,
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.address.is_empty() {
            return Err("server address must not be empty".to_string());
        }
        if !self.address.starts_with("http://") && !self.address.starts_with("https://") {
            return Err(format!(
                "server address must start with http:// or https://, got {:?}",
                self.address
            ));
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    pub frame_interval_ms: u64,
}

impl TimingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Validate for TimingConfig {
    fn validate(&self) -> Result<(), String> {
        validate_range("timing.tick_interval_ms", self.tick_interval_ms, 10..=1000)?;
        validate_range("timing.frame_interval_ms", self.frame_interval_ms, 1..=100)?;
        // A frame slower than the tick would drop ticks.
        if self.frame_interval_ms > self.tick_interval_ms {
            return Err(format!(
                "timing.frame_interval_ms ({}) must not exceed timing.tick_interval_ms ({})",
                self.frame_interval_ms, self.tick_interval_ms
            ));
        }
        Ok(())
    }
}
