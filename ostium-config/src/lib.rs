//! Configuration for the Ostium broker.
//!
//! Layered loading: built-in defaults, then an optional TOML file, then
//! `OSTIUM_*` environment variables (optionally seeded from a `.env`
//! file), later layers winning. Non-fatal findings are returned as
//! [`ConfigWarnings`] so the binary can log them once tracing is up.

pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{ConfigError, ConfigLoad, ConfigLoader, ConfigWarning, ConfigWarnings};
pub use models::{BrokerConfig, Config, ConfigMetadata, RegistryConfig, ServerConfig};
pub use sources::{EnvConfig, FileConfig};
