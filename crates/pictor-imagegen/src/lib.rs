#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

pub mod credentials;
mod dispatch;
mod error;
pub mod normalize;
mod persist;
mod protocol;
pub mod reconcile;
pub mod registry;
mod retry;
mod server;
pub mod storage;
#[cfg(test)]
mod test_support;
mod types;
pub mod upstream;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
    routing::post,
};

pub use error::{ImageGenError, Result};
pub use retry::RetryPolicy;
pub use server::{ImageGenServerBuilder, Server};
pub use types::{GeneratedImageRecord, GenerationRequest, GenerationResponse, ReferenceImage};

/// Path of the generation endpoint
pub const GENERATE_PATH: &str = "/api/generate";

/// Build the image generation server from configuration
///
/// # Errors
///
/// Returns an error if the server fails to initialize
pub fn build_server(config: &pictor_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        ImageGenServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize image generation server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for image generation
///
/// `POST` generates, `OPTIONS` answers preflight, anything else is a 405.
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new().route(
        GENERATE_PATH,
        post(generate).options(preflight).fallback(method_not_allowed),
    )
}

/// Handle image generation requests
async fn generate(
    State(server): State<Arc<Server>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<GenerationResponse>> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ImageGenError::PayloadTooLarge(rejection.body_text())
        } else {
            ImageGenError::Validation(format!("failed to read request body: {}", rejection.body_text()))
        }
    })?;

    let request: GenerationRequest = serde_json::from_slice(&body)
        .map_err(|e| ImageGenError::Validation(format!("malformed JSON body: {e}")))?;

    tracing::debug!("Image generation handler called for mode: {}", request.mode);

    let response = server.generate(&request).await?;

    tracing::debug!("Image generation complete");

    Ok(Json(response))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ImageGenError {
    ImageGenError::MethodNotAllowed
}
