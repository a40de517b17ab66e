#![allow(clippy::must_use_candidate)]

pub mod cors;
pub mod credentials;
mod env;
pub mod health;
mod loader;
pub mod provider;
pub mod server;
pub mod storage;
pub mod telemetry;

use serde::Deserialize;

pub use cors::*;
pub use credentials::*;
pub use health::*;
pub use provider::*;
pub use server::*;
pub use storage::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Pictor configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream image provider configuration
    pub provider: ProviderConfig,
    /// Bearer token source shared by the provider and storage clients
    pub credentials: CredentialsConfig,
    /// Blob store configuration for generated images
    pub storage: StorageConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
