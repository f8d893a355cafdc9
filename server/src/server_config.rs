use common::config::{ConfigManager, FileContentConfigProvider, Validate, YamlConfigSerializer, validate_range};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::game::FieldSize;

pub const DEFAULT_CONFIG_FILE: &str = "snake_server_config.yaml";

pub fn get_config_manager(
    path: &str,
) -> ConfigManager<FileContentConfigProvider, ServerConfig, YamlConfigSerializer> {
    ConfigManager::from_yaml_file(path)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub field: FieldConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct FieldConfig {
    pub width: usize,
    pub height: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.address
            .parse()
            .map_err(|e| format!("invalid listen address {:?}: {}", self.address, e))
    }

    pub fn field_size(&self) -> FieldSize {
        FieldSize {
            width: self.field.width,
            height: self.field.height,
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        self.socket_addr()?;
        self.field.validate()
    }
}

impl Validate for FieldConfig {
    fn validate(&self) -> Result<(), String> {
        // The seeded snake and food sit at (3, 3) and (4, 3).
        validate_range("field.width", self.width, 5..=100)?;
        validate_range("field.height", self.height, 5..=100)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "[::1]:5001".to_string(),
            field: FieldConfig {
                width: 25,
                height: 25,
            },
        }
    }
}
