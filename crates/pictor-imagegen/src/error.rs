use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::reconcile::ReconcileError;
use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Longest refusal excerpt echoed back to the client, in characters
pub const REFUSAL_EXCERPT_CHARS: usize = 200;

/// Image generation failures as seen by the client
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// Malformed or unrecognized input
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Input the selected mode cannot run without
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Provider declined and explained why
    #[error("Generation refused: {reason}")]
    GenerationRefused { reason: String },

    /// No images and no explanation
    #[error("No images produced")]
    NoImagesProduced,

    #[error("Failed to store generated images: {0}")]
    PersistenceFailure(#[from] StorageError),

    /// Request outlived the execution ceiling or a slow mode timed out upstream
    #[error("Request for mode '{mode}' exceeded the execution time limit")]
    PlatformTimeout { mode: String },

    #[error("Failed to acquire provider credentials: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// Body above the configured size limit
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ImageGenError {
    /// Fold a reconciliation failure into the client taxonomy
    pub fn from_reconcile(error: ReconcileError, mode: &str, slow: bool) -> Self {
        match error {
            ReconcileError::Refused { reason } => Self::GenerationRefused { reason },
            ReconcileError::NoImages { timed_out: true } if slow => Self::PlatformTimeout { mode: mode.to_owned() },
            ReconcileError::NoImages { .. } => Self::NoImagesProduced,
        }
    }

    /// Transport-level status; everything past method and size checks is a 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Low-cardinality label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::MissingInput(_) => "missing_input",
            Self::GenerationRefused { .. } => "refused",
            Self::NoImagesProduced => "no_images",
            Self::PersistenceFailure(_) => "persistence",
            Self::PlatformTimeout { .. } => "timeout",
            Self::Credentials(_) => "credentials",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }

    /// Message that is safe to expose to the client
    pub fn client_message(&self) -> String {
        match self {
            Self::GenerationRefused { reason } => format!(
                "The model declined to generate an image: {}",
                excerpt(reason, REFUSAL_EXCERPT_CHARS)
            ),
            Self::NoImagesProduced => {
                "No images were generated. The service may be busy, please try again in a moment.".to_string()
            }
            Self::PlatformTimeout { mode } if mode == "upscale" => {
                "The upscale took too long to complete. Try a smaller source image or a lower upscale level."
                    .to_string()
            }
            Self::PlatformTimeout { .. } => {
                "The request took too long to complete. Try fewer images or a lower resolution.".to_string()
            }
            Self::PersistenceFailure(_) => "Failed to store generated images".to_string(),
            Self::Credentials(_) => "Failed to authenticate with the image provider".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// First `max` characters of `text`, with an ellipsis when cut
fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_owned(),
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
}

impl IntoResponse for ImageGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "image generation failed");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                message: self.client_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}
