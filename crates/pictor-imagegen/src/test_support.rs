//! In-memory collaborators for unit tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;

use crate::credentials::{CredentialError, TokenProvider};
use crate::registry::Family;
use crate::storage::{BlobStore, PutObject, StorageError};
use crate::upstream::{TransportError, Upstream, UpstreamCall};

pub fn config() -> pictor_config::Config {
    pictor_config::Config::parse(
        r#"
        [provider]
        project = "pictor-test"

        [credentials]
        type = "static"
        token = "test-token"

        [storage]
        bucket = "pictor-test-images"
        "#,
    )
    .unwrap()
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
    pub metadata: BTreeMap<String, String>,
    pub public: bool,
}

/// Blob store keeping objects in a map; URLs are `memory://{key}`
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    /// Uploads allowed before every further one fails with 503
    fail_after: Option<usize>,
    uploads: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn failing_after(uploads: usize) -> Self {
        Self {
            fail_after: Some(uploads),
            ..Self::default()
        }
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, object: &PutObject<'_>, _token: &SecretString) -> Result<(), StorageError> {
        let upload = self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| upload >= limit) {
            return Err(StorageError::Status {
                status: 503,
                message: "backend unavailable".to_owned(),
            });
        }

        self.objects.lock().unwrap().insert(
            object.key.to_owned(),
            StoredObject {
                bytes: object.bytes.to_vec(),
                content_type: object.content_type.to_owned(),
                cache_control: object.cache_control.to_owned(),
                metadata: object
                    .metadata
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
                public: false,
            },
        );
        Ok(())
    }

    async fn make_public(&self, key: &str, _token: &SecretString) -> Result<(), StorageError> {
        match self.objects.lock().unwrap().get_mut(key) {
            Some(object) => {
                object.public = true;
                Ok(())
            }
            None => Err(StorageError::Status {
                status: 404,
                message: format!("no such object: {key}"),
            }),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}

enum Reply {
    Images(usize),
    Text(String),
}

/// Upstream answering every call the same way
pub struct ScriptedUpstream {
    reply: Reply,
    latency: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedUpstream {
    /// Each call yields `count` images for predict calls and one for generate calls
    pub fn images(count: usize) -> Self {
        Self {
            reply: Reply::Images(count),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Each call yields text and no image
    pub fn text(text: &str) -> Self {
        Self {
            reply: Reply::Text(text.to_owned()),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, call: &UpstreamCall<'_>, _token: &SecretString) -> Result<serde_json::Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        let predict = call.method == Family::Predict.method();
        Ok(match (&self.reply, predict) {
            (Reply::Images(count), true) => json!({
                "predictions": (0..*count)
                    .map(|_| json!({ "bytesBase64Encoded": "iVBORw0K", "mimeType": "image/png" }))
                    .collect::<Vec<_>>()
            }),
            (Reply::Images(_), false) => json!({ "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0K" } }
            ]}}]}),
            (Reply::Text(text), true) => json!({ "predictions": [{ "raiFilteredReason": text }] }),
            (Reply::Text(text), false) => json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }),
        })
    }
}

/// Token provider counting how often it was asked
#[derive(Default)]
pub struct CountingTokens {
    pub issued: AtomicUsize,
}

#[async_trait]
impl TokenProvider for CountingTokens {
    async fn token(&self) -> Result<SecretString, CredentialError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(SecretString::from("test-token"))
    }
}
