//! `:predict` request/response shapes (text-to-image and upscale)

use serde::{Deserialize, Serialize};

use super::{ImagePayload, ProviderResult, non_blank};
use crate::types::default_mime_type;
use crate::upstream::TransportError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PredictImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_watermark: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_image_size: Option<String>,
    /// Imagen only reports `raiFilteredReason` when asked to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_rai_reason: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upscale_config: Option<UpscaleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_options: Option<OutputOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleConfig {
    pub upscale_factor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    pub mime_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

pub(super) fn parse(body: serde_json::Value) -> Result<ProviderResult, TransportError> {
    let response: PredictResponse = serde_json::from_value(body)
        .map_err(|e| TransportError::malformed(format!("unexpected predict response: {e}")))?;

    let mut images = Vec::new();
    let mut filtered = Vec::new();

    for prediction in response.predictions {
        match prediction.bytes_base64_encoded.filter(|data| !data.is_empty()) {
            Some(data) => images.push(ImagePayload {
                data,
                mime_type: prediction.mime_type.unwrap_or_else(default_mime_type),
            }),
            None => filtered.extend(prediction.rai_filtered_reason.and_then(non_blank)),
        }
    }

    if images.is_empty() && !filtered.is_empty() {
        return Ok(ProviderResult::refusal(filtered.join("; ")));
    }

    Ok(ProviderResult::Success {
        images,
        auxiliary_text: None,
    })
}
