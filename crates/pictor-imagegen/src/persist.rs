//! Upload reconciled images and build the outbound records

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use jiff::Timestamp;
use secrecy::SecretString;
use uuid::Uuid;

use crate::normalize::RecordMetadata;
use crate::reconcile::ReconciledImage;
use crate::storage::{BlobStore, PutObject, StorageError};
use crate::types::GeneratedImageRecord;

const FALLBACK_CONTENT_TYPE: &str = "image/png";

/// Serve the type the provider reported; anything that is not an image type falls back to PNG
fn stored_content_type(mime_type: &str) -> &str {
    if mime_type.starts_with("image/") {
        mime_type
    } else {
        FALLBACK_CONTENT_TYPE
    }
}

pub struct Persistence {
    store: Arc<dyn BlobStore>,
    prefix: String,
    cache_control: String,
}

impl Persistence {
    pub fn new(store: Arc<dyn BlobStore>, prefix: String, cache_control: String) -> Self {
        Self {
            store,
            prefix,
            cache_control,
        }
    }

    /// Fresh object key: `{prefix}/{unix-millis}-{uuid}.png`
    pub fn object_key(&self) -> String {
        format!(
            "{}/{}-{}.png",
            self.prefix,
            Timestamp::now().as_millisecond(),
            Uuid::new_v4()
        )
    }

    /// Upload every image in parallel and return records in input order
    ///
    /// Fails as a whole if any upload or visibility change fails.
    pub async fn persist(
        &self,
        images: Vec<ReconciledImage>,
        metadata: &RecordMetadata,
        token: &SecretString,
    ) -> Result<Vec<GeneratedImageRecord>, StorageError> {
        try_join_all(images.into_iter().map(|image| self.persist_one(image, metadata, token))).await
    }

    async fn persist_one(
        &self,
        image: ReconciledImage,
        metadata: &RecordMetadata,
        token: &SecretString,
    ) -> Result<GeneratedImageRecord, StorageError> {
        let key = self.object_key();

        let object = PutObject {
            key: &key,
            bytes: &image.bytes,
            content_type: stored_content_type(&image.mime_type),
            cache_control: &self.cache_control,
            metadata: BTreeMap::from([("prompt", metadata.prompt.as_str()), ("mode", metadata.mode)]),
        };

        self.store.put(&object, token).await?;
        self.store.make_public(&key, token).await?;
        tracing::debug!(key, bytes = image.bytes.len(), "stored image");

        Ok(GeneratedImageRecord {
            url: self.store.public_url(&key),
            prompt: metadata.prompt.clone(),
            aspect_ratio: metadata.aspect_ratio.clone(),
            size_label: metadata.size_label.clone(),
            mode: metadata.mode.to_owned(),
            auxiliary_text: image.auxiliary_text,
        })
    }
}
