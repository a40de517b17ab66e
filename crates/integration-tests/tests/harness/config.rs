//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use pictor_config::{
    Config, CorsConfig, CredentialsConfig, HealthConfig, ModelOverrides, ProviderConfig, ServerConfig,
    StorageConfig,
};
use secrecy::SecretString;
use url::Url;

use super::mock_google::MockGoogle;

pub const PROJECT: &str = "pictor-it";
pub const BUCKET: &str = "pictor-it-images";
pub const TOKEN: &str = "ya29.integration";
pub const PUBLIC_BASE: &str = "https://cdn.pictor.test";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal configuration pointing every collaborator at `mock`
    ///
    /// Backoff and stagger are shortened so retry paths finish quickly.
    pub fn new(mock: &MockGoogle) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                provider: ProviderConfig {
                    project: PROJECT.to_owned(),
                    location: "us-central1".to_owned(),
                    base_url: Some(Url::parse(&mock.provider_url()).expect("valid URL")),
                    timeout: "10s".to_owned(),
                    execution_ceiling: "30s".to_owned(),
                    max_attempts: 3,
                    backoff: "10ms".to_owned(),
                    stagger: "50ms".to_owned(),
                    models: ModelOverrides::default(),
                },
                credentials: CredentialsConfig::Static {
                    token: SecretString::from(TOKEN),
                },
                storage: StorageConfig {
                    bucket: BUCKET.to_owned(),
                    prefix: "generated".to_owned(),
                    cache_control: "public, max-age=31536000".to_owned(),
                    base_url: Some(Url::parse(&mock.storage_url()).expect("valid URL")),
                    public_base_url: Some(Url::parse(PUBLIC_BASE).expect("valid URL")),
                },
                telemetry: None,
            },
        }
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Cap inbound bodies
    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.config.server.max_body_bytes = limit;
        self
    }

    /// Hard ceiling for one request
    pub fn with_execution_ceiling(mut self, ceiling: &str) -> Self {
        ceiling.clone_into(&mut self.config.provider.execution_ceiling);
        self
    }

    /// Override the model behind a mode
    pub fn with_ultra_model(mut self, model: &str) -> Self {
        self.config.provider.models.ultra = Some(model.to_owned());
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
