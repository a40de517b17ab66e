//! Bearer tokens for provider and storage calls

use std::time::Duration;

use async_trait::async_trait;
use pictor_config::CredentialsConfig;
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid token URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Source of a bearer token, asked once per request
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<SecretString, CredentialError>;
}

/// Token fixed at startup
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<SecretString, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Service account token from the compute metadata server
pub struct MetadataServerTokenProvider {
    client: Client,
    url: Url,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: SecretString,
}

impl MetadataServerTokenProvider {
    pub fn new(url: Option<Url>) -> Result<Self, CredentialError> {
        let url = match url {
            Some(url) => url,
            None => Url::parse(DEFAULT_METADATA_TOKEN_URL)?,
        };
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl TokenProvider for MetadataServerTokenProvider {
    async fn token(&self) -> Result<SecretString, CredentialError> {
        let response = self
            .client
            .get(self.url.clone())
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let token: MetadataToken = response.json().await?;
        Ok(token.access_token)
    }
}

/// Build the configured token provider
pub fn from_config(config: &CredentialsConfig) -> Result<Box<dyn TokenProvider>, CredentialError> {
    Ok(match config {
        CredentialsConfig::Static { token } => Box::new(StaticTokenProvider::new(token.clone())),
        CredentialsConfig::MetadataServer { url } => Box::new(MetadataServerTokenProvider::new(url.clone())?),
    })
}
