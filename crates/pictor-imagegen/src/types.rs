use serde::{Deserialize, Serialize};

/// Image generation request sent by the client application
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Mode tag selecting the model family (e.g. "standard", "multimodal-v2")
    pub mode: String,
    /// Text description of the desired image; optional for upscale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Ordered reference images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImage>,
    /// Aspect ratio token such as "1:1" or "16:9"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Target edge length in pixels (1024, 2048, 4096)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_hint: Option<u32>,
    /// Number of images to produce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_count: Option<u32>,
    /// Target size for upscale mode; selects the scale factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscale_level: Option<u32>,
    /// Ask the provider to watermark its output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_watermark: Option<bool>,
}

/// Base64-encoded reference image supplied by the client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub base64_data: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

pub(crate) fn default_mime_type() -> String {
    "image/png".to_string()
}

/// One generated, stored and publicly reachable image
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageRecord {
    /// Public URL of the stored image
    pub url: String,
    /// Prompt the image was generated from
    pub prompt: String,
    pub aspect_ratio: String,
    /// Size tier actually served (e.g. "2K", or "x4" for upscales)
    pub size_label: String,
    /// Canonical mode that served the request
    pub mode: String,
    /// Text the model returned alongside the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_text: Option<String>,
}

/// Successful response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationResponse {
    pub images: Vec<GeneratedImageRecord>,
}
