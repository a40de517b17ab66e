//! `:generateContent` request/response shapes (multimodal image models)

use serde::{Deserialize, Serialize};

use super::{ImagePayload, ProviderResult, non_blank};
use crate::types::default_mime_type;
use crate::upstream::TransportError;

/// Finish reasons that mean the model declined rather than failed
const REFUSAL_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
    "IMAGE_RECITATION",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub candidate_count: u32,
    pub image_config: ImageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
    /// Reasoning summaries are not user-facing text
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

pub(super) fn parse(body: serde_json::Value) -> Result<ProviderResult, TransportError> {
    let response: GenerateResponse = serde_json::from_value(body)
        .map_err(|e| TransportError::malformed(format!("unexpected generateContent response: {e}")))?;

    let mut images = Vec::new();
    let mut texts = Vec::new();
    let mut refusal_reason = None;

    for candidate in response.candidates {
        for part in candidate.content.into_iter().flat_map(|content| content.parts) {
            if let Some(inline) = part.inline_data.filter(|inline| !inline.data.is_empty()) {
                images.push(ImagePayload {
                    data: inline.data,
                    mime_type: inline.mime_type,
                });
            } else if !part.thought
                && let Some(text) = part.text.and_then(non_blank)
            {
                texts.push(text);
            }
        }

        if let Some(reason) = candidate
            .finish_reason
            .filter(|reason| REFUSAL_FINISH_REASONS.contains(&reason.as_str()))
        {
            refusal_reason = Some(format!("generation stopped: {reason}"));
        }
    }

    let auxiliary_text = if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    };

    if images.is_empty() {
        if let Some(feedback) = response.prompt_feedback
            && let Some(reason) = feedback.block_reason
        {
            let message = feedback
                .block_reason_message
                .and_then(non_blank)
                .unwrap_or_else(|| format!("prompt blocked: {reason}"));
            return Ok(ProviderResult::refusal(message));
        }

        if auxiliary_text.is_none()
            && let Some(reason) = refusal_reason
        {
            return Ok(ProviderResult::refusal(reason));
        }
    }

    Ok(ProviderResult::Success {
        images,
        auxiliary_text,
    })
}
