use std::time::Duration;

use async_trait::async_trait;
use pictor_config::StorageConfig;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use super::{BlobStore, PutObject, StorageError};
use crate::upstream::vertex::upstream_error_message;

const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Storage JSON API client
pub struct GcsBlobStore {
    client: Client,
    bucket: String,
    api_base: Url,
    public_base: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource<'a> {
    name: &'a str,
    content_type: &'a str,
    cache_control: &'a str,
    metadata: &'a std::collections::BTreeMap<&'static str, &'a str>,
}

#[derive(Serialize)]
struct AccessControl {
    entity: &'static str,
    role: &'static str,
}

impl GcsBlobStore {
    pub fn new(config: &StorageConfig, timeout: Duration) -> Result<Self, StorageError> {
        let api_base = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_API_BASE).map_err(|e| StorageError::Url(e.to_string()))?,
        };
        let public_base = config
            .public_base_url
            .as_ref()
            .map_or(DEFAULT_API_BASE, Url::as_str)
            .trim_end_matches('/')
            .to_owned();
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            api_base,
            public_base,
        })
    }

    /// Append path segments to the API base, percent-encoding each one
    fn api_url(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::Url(format!("{} cannot be a base URL", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn upload_url(&self) -> Result<Url, StorageError> {
        let mut url = self.api_url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut().append_pair("uploadType", "multipart");
        Ok(url)
    }

    fn acl_url(&self, key: &str) -> Result<Url, StorageError> {
        self.api_url(&["storage", "v1", "b", &self.bucket, "o", key, "acl"])
    }
}

/// `multipart/related` body: JSON object resource followed by the media
fn multipart_body(boundary: &str, resource: &[u8], content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(resource.len() + bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
    body.extend_from_slice(resource);
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

async fn check(response: Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Status {
        status: status.as_u16(),
        message: upstream_error_message(&body),
    })
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(&self, object: &PutObject<'_>, token: &SecretString) -> Result<(), StorageError> {
        let resource = serde_json::to_vec(&ObjectResource {
            name: object.key,
            content_type: object.content_type,
            cache_control: object.cache_control,
            metadata: &object.metadata,
        })?;

        let boundary = format!("pictor-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_body(&boundary, &resource, object.content_type, object.bytes);

        let response = self
            .client
            .post(self.upload_url()?)
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await?;

        check(response).await
    }

    async fn make_public(&self, key: &str, token: &SecretString) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.acl_url(key)?)
            .bearer_auth(token.expose_secret())
            .json(&AccessControl {
                entity: "allUsers",
                role: "READER",
            })
            .send()
            .await?;

        check(response).await
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.public_base, self.bucket)
    }
}
