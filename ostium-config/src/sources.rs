//! Raw configuration sources: the TOML file shape and the `OSTIUM_*`
//! environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub registry: FileRegistryConfig,
    #[serde(default)]
    pub broker: FileBrokerConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRegistryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Humantime form, e.g. `"30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBrokerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_base_url: Option<String>,
}

/// Environment-derived configuration values. Numeric and duration
/// values stay raw strings here; the loader parses them so a malformed
/// value surfaces as a warning instead of vanishing.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub registry_url: Option<String>,
    pub registry_timeout: Option<String>,
    pub page_size: Option<String>,
    pub parallelism: Option<String>,
    pub spec_base_url: Option<String>,
}

impl EnvConfig {
    /// Reads the `OSTIUM_*` variables from the process environment.
    pub fn gather() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Same, from an explicit key/value iterator. Tests use this to
    /// avoid mutating the process environment.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut env = Self::default();
        for (key, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_str() {
                "OSTIUM_CONFIG" => env.config_path = Some(PathBuf::from(value)),
                "OSTIUM_HOST" => env.server_host = Some(value),
                "OSTIUM_PORT" => env.server_port = Some(value),
                "OSTIUM_REGISTRY_URL" => env.registry_url = Some(value),
                "OSTIUM_REGISTRY_TIMEOUT" => env.registry_timeout = Some(value),
                "OSTIUM_PAGE_SIZE" => env.page_size = Some(value),
                "OSTIUM_PARALLELISM" => env.parallelism = Some(value),
                "OSTIUM_SPEC_BASE_URL" => env.spec_base_url = Some(value),
                _ => {}
            }
        }
        env
    }
}
