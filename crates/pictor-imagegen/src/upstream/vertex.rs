use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{TransportError, TransportErrorKind, Upstream, UpstreamCall};

/// Vertex AI model endpoint transport
pub(crate) struct VertexUpstream {
    client: Client,
    project: String,
    location: String,
    base_url: Option<Url>,
}

impl VertexUpstream {
    pub fn new(project: String, location: String, base_url: Option<Url>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            project,
            location,
            base_url,
        })
    }

    /// API root for a location, up to and including the version segment
    fn api_root(&self, location: &str) -> String {
        match &self.base_url {
            Some(url) => url.as_str().trim_end_matches('/').to_owned(),
            None if location == "global" => "https://aiplatform.googleapis.com/v1".to_owned(),
            None => format!("https://{location}-aiplatform.googleapis.com/v1"),
        }
    }

    /// Full model RPC URL
    ///
    /// `{root}/projects/{project}/locations/{location}/publishers/google/models/{model}:{method}`
    fn endpoint(&self, call: &UpstreamCall<'_>) -> String {
        let location = call.location.unwrap_or(&self.location);
        format!(
            "{}/projects/{}/locations/{location}/publishers/google/models/{}:{}",
            self.api_root(location),
            self.project,
            call.model,
            call.method
        )
    }
}

/// Structured error body returned by Google APIs
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Prefer the structured `error.message`, fall back to the raw body
pub(crate) fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_owned()
            } else {
                trimmed.to_owned()
            }
        })
}

#[async_trait]
impl Upstream for VertexUpstream {
    async fn send(&self, call: &UpstreamCall<'_>, token: &SecretString) -> Result<serde_json::Value, TransportError> {
        let url = self.endpoint(call);

        tracing::debug!(
            mode = call.mode,
            model = call.model,
            slot = call.slot,
            attempt = call.attempt,
            "sending upstream request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(call.payload)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    TransportErrorKind::Timeout
                } else {
                    TransportErrorKind::Network
                };
                TransportError::new(kind, format!("request to {} failed: {e}", call.model))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let kind = if e.is_timeout() {
                TransportErrorKind::Timeout
            } else {
                TransportErrorKind::Network
            };
            TransportError::new(kind, format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            tracing::warn!(
                mode = call.mode,
                slot = call.slot,
                attempt = call.attempt,
                status = %status,
                "upstream returned error"
            );
            return Err(TransportError::new(
                TransportErrorKind::Status(status.as_u16()),
                upstream_error_message(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| TransportError::malformed(format!("response is not JSON: {e}")))
    }
}
