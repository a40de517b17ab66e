//! Provider wire formats and their reduction to [`ProviderResult`]

pub(crate) mod generate;
pub(crate) mod predict;

use serde::Serialize;

use crate::registry::Family;
use crate::upstream::TransportError;

/// Provider-specific request body built by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderPayload {
    Predict(predict::PredictRequest),
    Generate(generate::GenerateRequest),
}

#[cfg(test)]
impl ProviderPayload {
    pub(crate) fn empty() -> Self {
        Self::Predict(predict::PredictRequest {
            instances: Vec::new(),
            parameters: predict::PredictParameters::default(),
        })
    }
}

/// Base64 image data as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

/// Outcome of one dispatch slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResult {
    /// Well-formed response; may carry zero images and only text
    Success {
        images: Vec<ImagePayload>,
        auxiliary_text: Option<String>,
    },
    /// Explicit refusal, or a slot that exhausted its transport retries
    Failure {
        message: String,
        is_refusal: bool,
        timed_out: bool,
    },
}

impl ProviderResult {
    pub fn refusal(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            is_refusal: true,
            timed_out: false,
        }
    }

    pub fn transport_failure(error: &TransportError) -> Self {
        Self::Failure {
            message: error.to_string(),
            is_refusal: false,
            timed_out: error.timed_out(),
        }
    }

    /// Number of images carried by this result
    pub fn image_count(&self) -> usize {
        match self {
            Self::Success { images, .. } => images.len(),
            Self::Failure { .. } => 0,
        }
    }
}

/// Reduce a 2xx JSON body to a slot result using the family's response shape
///
/// A body that does not match the shape is a transport failure and will be
/// retried; a well-formed body without images is not.
pub fn parse_response(family: Family, body: serde_json::Value) -> Result<ProviderResult, TransportError> {
    match family {
        Family::Predict | Family::Upscale => predict::parse(body),
        Family::Generate => generate::parse(body),
    }
}

/// Collapse whitespace-only text to `None`
fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_owned())
    }
}
