//! Resolved configuration model, produced by [`crate::loader`].

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub broker: BrokerConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection settings for the graph backend.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub url: Url,
    /// Per-request timeout of the outbound HTTP client.
    pub timeout: Duration,
    /// Page size for every collection query.
    pub page_size: u32,
    /// Concurrency budget of the catalog fetch pipeline.
    pub parallelism: usize,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Externally reachable base URL baked into catalog spec links,
    /// without a trailing slash.
    pub spec_base_url: String,
}

/// Where the configuration actually came from, for startup logging.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 8080,
        };
        assert_eq!(server.bind_address(), "127.0.0.1:8080");
    }
}
