pub(crate) mod gcs;

use std::collections::BTreeMap;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

pub use gcs::GcsBlobStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("storage returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid storage URL: {0}")]
    Url(String),
    #[error("unserializable object resource: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Object to upload
#[derive(Debug, Clone)]
pub struct PutObject<'a> {
    pub key: &'a str,
    pub bytes: &'a [u8],
    pub content_type: &'a str,
    pub cache_control: &'a str,
    /// Provenance stored with the object, never read back
    pub metadata: BTreeMap<&'static str, &'a str>,
}

/// Object storage for generated images
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload an object; the object is not public afterwards
    async fn put(&self, object: &PutObject<'_>, token: &SecretString) -> Result<(), StorageError>;

    /// Grant anonymous read access to an uploaded object
    async fn make_public(&self, key: &str, token: &SecretString) -> Result<(), StorageError>;

    /// URL at which a public object is served
    fn public_url(&self, key: &str) -> String;
}
