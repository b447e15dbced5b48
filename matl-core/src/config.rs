#![forbid(unsafe_code)]

//! Driver settings, loadable from TOML.

use std::path::Path;

use miette::Report;
use serde::{Deserialize, Serialize};

pub type ConfigError = Report;

fn config_msg(message: impl Into<String>) -> ConfigError {
    Report::msg(message.into())
}

/// Options handed to the DAG generator for every module compilation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DagOptions {
    /// Allow calls to non-exported functions of the same module.
    #[serde(default = "default_true")]
    pub allow_local_calls: bool,

    /// Emit non-exported functions and materials as well.
    #[serde(default = "default_true")]
    pub include_local_entities: bool,
}

impl Default for DagOptions {
    fn default() -> Self {
        Self {
            allow_local_calls: true,
            include_local_entities: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    #[serde(default)]
    pub dag: DagOptions,

    /// Emit an info record for every non-builtin module that gets registered.
    #[serde(default = "default_true")]
    pub log_module_loads: bool,

    /// The one name accepted by stream loading besides valid module names.
    #[serde(default = "default_stream_module_name")]
    pub stream_module_name: String,
}

fn default_true() -> bool {
    true
}

fn default_stream_module_name() -> String {
    "::<memory>".to_string()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            dag: DagOptions::default(),
            log_module_loads: true,
            stream_module_name: default_stream_module_name(),
        }
    }
}

impl DriverConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|e| config_msg(format!("Failed to parse config: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            config_msg(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| config_msg(format!("Failed to serialize config: {e}")))
    }
}
