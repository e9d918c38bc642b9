//! Layered loading: built-in defaults, then the TOML file, then the
//! `OSTIUM_*` environment, later layers winning.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{BrokerConfig, Config, ConfigMetadata, RegistryConfig, ServerConfig};
use crate::sources::{EnvConfig, FileConfig};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_PARALLELISM: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("registry URL is not configured (OSTIUM_REGISTRY_URL or [registry].url)")]
    MissingRegistryUrl,
    #[error("invalid registry URL {value:?}")]
    InvalidRegistryUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// One non-fatal finding from the load.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, message: impl Into<String>, hint: Option<&str>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: hint.map(str::to_owned),
        });
    }
}

/// Result of a load: the resolved config plus everything worth
/// reporting once logging is up.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env: Option<EnvConfig>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit config file path, taking precedence over `OSTIUM_CONFIG`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Injects a pre-gathered environment. Without this the loader reads
    /// a `.env` file and the process environment; tests inject instead.
    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.env = Some(env);
        self
    }

    pub fn load(self) -> Result<ConfigLoad, ConfigError> {
        let mut warnings = ConfigWarnings::default();

        let (env, env_file_loaded) = match self.env {
            Some(env) => (env, false),
            None => {
                let env_file_loaded = dotenvy::dotenv().is_ok();
                (EnvConfig::gather(), env_file_loaded)
            }
        };

        let config_path = self.config_path.or_else(|| env.config_path.clone());
        let file = match &config_path {
            Some(path) => {
                let file = read_file(path)?;
                debug!(path = %path.display(), "loaded config file");
                file
            }
            None => FileConfig::default(),
        };

        let host = env
            .server_host
            .clone()
            .or_else(|| file.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = resolve(
            &mut warnings,
            "server port",
            env.server_port.as_deref(),
            file.server.port,
            DEFAULT_PORT,
        );

        let raw_url = env
            .registry_url
            .clone()
            .or_else(|| file.registry.url.clone())
            .ok_or(ConfigError::MissingRegistryUrl)?;
        let url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidRegistryUrl {
            value: raw_url,
            source,
        })?;

        let timeout = resolve_timeout(
            &mut warnings,
            env.registry_timeout.as_deref(),
            file.registry.timeout.as_deref(),
        );

        let mut page_size = resolve(
            &mut warnings,
            "page size",
            env.page_size.as_deref(),
            file.registry.page_size,
            DEFAULT_PAGE_SIZE,
        );
        if page_size == 0 {
            warnings.push(
                format!("page size 0 requested, using {DEFAULT_PAGE_SIZE}"),
                None,
            );
            page_size = DEFAULT_PAGE_SIZE;
        }

        let mut parallelism = resolve(
            &mut warnings,
            "parallelism",
            env.parallelism.as_deref(),
            file.registry.parallelism,
            DEFAULT_PARALLELISM,
        );
        if parallelism == 0 {
            warnings.push(
                "parallelism 0 would stall the fetch pipeline, using 1",
                Some("set OSTIUM_PARALLELISM to a positive number"),
            );
            parallelism = 1;
        }

        let spec_base_url = match env
            .spec_base_url
            .clone()
            .or_else(|| file.broker.spec_base_url.clone())
        {
            Some(value) => value.trim_end_matches('/').to_owned(),
            None => {
                let derived = format!("http://{host}:{port}");
                warnings.push(
                    format!("spec base URL not configured, deriving {derived}"),
                    Some("set OSTIUM_SPEC_BASE_URL to the externally reachable address"),
                );
                derived
            }
        };

        Ok(ConfigLoad {
            config: Config {
                server: ServerConfig { host, port },
                registry: RegistryConfig {
                    url,
                    timeout,
                    page_size,
                    parallelism,
                },
                broker: BrokerConfig { spec_base_url },
                metadata: ConfigMetadata {
                    config_path,
                    env_file_loaded,
                },
            },
            warnings,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_owned(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_owned(),
        source,
    })
}

/// Environment wins when it parses; a malformed value is reported and
/// the file value (or default) is kept.
fn resolve<T: FromStr + Copy>(
    warnings: &mut ConfigWarnings,
    what: &str,
    raw_env: Option<&str>,
    file: Option<T>,
    default: T,
) -> T {
    match raw_env {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warnings.push(
                    format!("ignoring unparsable {what} {raw:?} from the environment"),
                    None,
                );
                file.unwrap_or(default)
            }
        },
        None => file.unwrap_or(default),
    }
}

fn resolve_timeout(
    warnings: &mut ConfigWarnings,
    env_raw: Option<&str>,
    file_raw: Option<&str>,
) -> Duration {
    for (source, raw) in [("environment", env_raw), ("config file", file_raw)] {
        let Some(raw) = raw else { continue };
        match humantime::parse_duration(raw) {
            Ok(value) => return value,
            Err(_) => warnings.push(
                format!("ignoring unparsable registry timeout {raw:?} from the {source}"),
                Some("use a humantime form such as \"30s\""),
            ),
        }
    }
    DEFAULT_TIMEOUT
}
