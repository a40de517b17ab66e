use std::sync::Arc;
use std::time::{Duration, Instant};

use pictor_telemetry::{
    KeyValue,
    metrics::{ImageGenMetrics, record_duration},
};

use crate::{
    credentials::{self, TokenProvider},
    dispatch::Dispatcher,
    error::{ImageGenError, Result},
    normalize::{PreparedRequest, normalize},
    persist::Persistence,
    reconcile::reconcile,
    registry::ModeRegistry,
    retry::RetryPolicy,
    storage::{BlobStore, GcsBlobStore},
    types::{GenerationRequest, GenerationResponse},
    upstream::{Upstream, vertex::VertexUpstream},
};

/// Image generation pipeline: normalize, dispatch, reconcile, persist
pub struct Server {
    registry: ModeRegistry,
    dispatcher: Dispatcher,
    persistence: Persistence,
    tokens: Arc<dyn TokenProvider>,
    execution_ceiling: Duration,
    metrics: ImageGenMetrics,
}

impl Server {
    /// Serve one generation request end to end
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let start = Instant::now();

        let prepared = match normalize(request, &self.registry) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::debug!(mode = %request.mode, error = %e, "rejected request");
                self.record_outcome("unknown", e.kind(), start);
                return Err(e);
            }
        };
        let mode = prepared.spec.tag;

        let result = match tokio::time::timeout(self.execution_ceiling, self.execute(&prepared)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(mode, ceiling = ?self.execution_ceiling, "request hit the execution ceiling");
                Err(ImageGenError::PlatformTimeout { mode: mode.to_owned() })
            }
        };

        match &result {
            Ok(response) => {
                self.metrics.images.add(
                    u64::try_from(response.images.len()).unwrap_or(u64::MAX),
                    &[KeyValue::new("mode", mode)],
                );
                self.record_outcome(mode, "success", start);
                tracing::info!(mode, images = response.images.len(), "generation complete");
            }
            Err(e) => self.record_outcome(mode, e.kind(), start),
        }

        result
    }

    async fn execute(&self, prepared: &PreparedRequest<'_>) -> Result<GenerationResponse> {
        let spec = prepared.spec;
        let token = self.tokens.token().await?;

        let results = self.dispatcher.dispatch(prepared, &token).await;
        let mut images = reconcile(results).map_err(|e| ImageGenError::from_reconcile(e, spec.tag, spec.slow))?;
        // Providers may return more than asked for; keep the first in slot order
        images.truncate(usize::try_from(prepared.image_count).unwrap_or(usize::MAX));

        tracing::debug!(mode = spec.tag, images = images.len(), "persisting images");
        let images = self.persistence.persist(images, &prepared.metadata, &token).await?;

        Ok(GenerationResponse { images })
    }

    fn record_outcome(&self, mode: &'static str, outcome: &'static str, start: Instant) {
        self.metrics.requests.add(
            1,
            &[KeyValue::new("mode", mode), KeyValue::new("outcome", outcome)],
        );
        record_duration(&self.metrics.duration, start, &[KeyValue::new("mode", mode)]);
    }
}

/// Builder for constructing the image generation server from configuration
///
/// Collaborators default to the Vertex AI transport, the Cloud Storage blob
/// store and the configured token source; each can be replaced.
pub struct ImageGenServerBuilder<'a> {
    config: &'a pictor_config::Config,
    upstream: Option<Arc<dyn Upstream>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    metrics: Option<ImageGenMetrics>,
}

impl<'a> ImageGenServerBuilder<'a> {
    pub fn new(config: &'a pictor_config::Config) -> Self {
        Self {
            config,
            upstream: None,
            blob_store: None,
            token_provider: None,
            metrics: None,
        }
    }

    pub fn upstream(mut self, upstream: Arc<dyn Upstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    pub fn token_provider(mut self, token_provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(token_provider);
        self
    }

    pub fn metrics(mut self, metrics: ImageGenMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Server> {
        let provider = &self.config.provider;
        let storage = &self.config.storage;

        let timeout = parse_duration("provider.timeout", &provider.timeout)?;
        let execution_ceiling = parse_duration("provider.execution_ceiling", &provider.execution_ceiling)?;
        let retry = RetryPolicy {
            max_attempts: provider.max_attempts,
            backoff: parse_duration("provider.backoff", &provider.backoff)?,
        };
        let stagger = parse_duration("provider.stagger", &provider.stagger)?;

        let upstream = match self.upstream {
            Some(upstream) => upstream,
            None => Arc::new(
                VertexUpstream::new(
                    provider.project.clone(),
                    provider.location.clone(),
                    provider.base_url.clone(),
                    timeout,
                )
                .map_err(|e| ImageGenError::Config(format!("failed to build provider client: {e}")))?,
            ),
        };

        let blob_store = match self.blob_store {
            Some(store) => store,
            None => Arc::new(
                GcsBlobStore::new(storage, timeout)
                    .map_err(|e| ImageGenError::Config(format!("failed to build storage client: {e}")))?,
            ),
        };

        let tokens: Arc<dyn TokenProvider> = match self.token_provider {
            Some(tokens) => tokens,
            None => Arc::from(credentials::from_config(&self.config.credentials)?),
        };

        let registry = ModeRegistry::with_overrides(&provider.models);
        let metrics = self.metrics.unwrap_or_else(ImageGenMetrics::global);

        tracing::debug!(
            project = %provider.project,
            location = %provider.location,
            bucket = %storage.bucket,
            max_attempts = retry.max_attempts,
            "image generation server initialized"
        );

        Ok(Server {
            registry,
            dispatcher: Dispatcher::new(upstream, retry, stagger, metrics.clone()),
            persistence: Persistence::new(blob_store, storage.prefix.clone(), storage.cache_control.clone()),
            tokens,
            execution_ceiling,
            metrics,
        })
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    duration_str::parse(value).map_err(|e| ImageGenError::Config(format!("invalid {field} '{value}': {e}")))
}
