//! Inbound request to provider payload mapping

use crate::error::{ImageGenError, Result};
use crate::protocol::ProviderPayload;
use crate::protocol::generate::{Content, GenerateRequest, GenerationConfig, ImageConfig, InlineData, Part};
use crate::protocol::predict::{
    OutputOptions, PredictImage, PredictInstance, PredictParameters, PredictRequest, UpscaleConfig,
};
use crate::registry::{Family, ModeRegistry, ModeSpec, UpscaleFactor};
use crate::types::{GenerationRequest, ReferenceImage};

pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Prompt recorded for upscales, which need no text from the client
pub const UPSCALE_PLACEHOLDER_PROMPT: &str = "Upscale the image";

/// Keeps multimodal models from embellishing beyond the literal prompt
pub const LITERAL_PROMPT_PREFIX: &str = "Generate an image that depicts exactly what the following prompt describes. \
Do not add subjects, text, styles or details that the prompt does not ask for.\n\nPrompt: ";

/// Fields echoed on every record produced for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub prompt: String,
    pub aspect_ratio: String,
    /// Tier actually served, never the one merely requested
    pub size_label: String,
    pub mode: &'static str,
}

/// Validated request ready for dispatch
#[derive(Debug, Clone)]
pub struct PreparedRequest<'a> {
    pub spec: &'a ModeSpec,
    pub payload: ProviderPayload,
    /// Clamped image count
    pub image_count: u32,
    pub metadata: RecordMetadata,
}

/// Validate a client request and build the provider payload for its mode
///
/// Pure: identical input yields an identical payload.
///
/// # Errors
///
/// `Validation` for an unknown mode, a missing prompt or empty reference
/// data; `MissingInput` for an upscale without a reference image.
pub fn normalize<'a>(request: &GenerationRequest, registry: &'a ModeRegistry) -> Result<PreparedRequest<'a>> {
    let spec = registry
        .resolve(&request.mode)
        .ok_or_else(|| ImageGenError::Validation(format!("unknown mode '{}'", request.mode)))?;

    if let Some(index) = request
        .reference_images
        .iter()
        .position(|image| image.base64_data.trim().is_empty())
    {
        return Err(ImageGenError::Validation(format!(
            "reference image {index} has no data"
        )));
    }

    let prompt = request
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty());

    let prompt = match (prompt, spec.requires_prompt()) {
        (Some(prompt), _) => prompt.to_owned(),
        (None, false) => UPSCALE_PLACEHOLDER_PROMPT.to_owned(),
        (None, true) => {
            return Err(ImageGenError::Validation(format!(
                "prompt is required for mode '{}'",
                spec.tag
            )));
        }
    };

    let aspect_ratio = request
        .aspect_ratio
        .as_deref()
        .map(str::trim)
        .filter(|ratio| !ratio.is_empty())
        .unwrap_or(DEFAULT_ASPECT_RATIO)
        .to_owned();

    let image_count = spec.clamp_image_count(request.image_count);
    let references = &request.reference_images[..request.reference_images.len().min(spec.max_reference_images)];

    let (payload, size_label) = match spec.family {
        Family::Predict => {
            let tier = spec.serve_tier(request.resolution_hint);
            let payload = ProviderPayload::Predict(PredictRequest {
                instances: vec![PredictInstance {
                    prompt: prompt.clone(),
                    image: references.first().map(predict_image),
                }],
                parameters: PredictParameters {
                    sample_count: image_count,
                    aspect_ratio: Some(aspect_ratio.clone()),
                    add_watermark: Some(request.add_watermark.unwrap_or(true)),
                    sample_image_size: spec.has_selectable_size().then(|| tier.label().to_owned()),
                    include_rai_reason: Some(true),
                    ..PredictParameters::default()
                },
            });
            (payload, tier.label())
        }
        Family::Upscale => {
            let source = references.first().ok_or_else(|| {
                ImageGenError::MissingInput("upscale requires a reference image".to_owned())
            })?;
            let factor = UpscaleFactor::from_level(request.upscale_level);
            let payload = ProviderPayload::Predict(PredictRequest {
                instances: vec![PredictInstance {
                    prompt: prompt.clone(),
                    image: Some(predict_image(source)),
                }],
                parameters: PredictParameters {
                    sample_count: 1,
                    add_watermark: Some(request.add_watermark.unwrap_or(true)),
                    mode: Some("upscale".to_owned()),
                    upscale_config: Some(UpscaleConfig {
                        upscale_factor: factor.label().to_owned(),
                    }),
                    output_options: Some(OutputOptions {
                        mime_type: "image/png".to_owned(),
                    }),
                    ..PredictParameters::default()
                },
            });
            (payload, factor.label())
        }
        Family::Generate => {
            let tier = spec.serve_tier(request.resolution_hint);
            let parts = std::iter::once(Part::Text(format!("{LITERAL_PROMPT_PREFIX}{prompt}")))
                .chain(references.iter().map(|image| {
                    Part::InlineData(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.base64_data.clone(),
                    })
                }))
                .collect();
            let payload = ProviderPayload::Generate(GenerateRequest {
                contents: vec![Content {
                    role: "user".to_owned(),
                    parts,
                }],
                generation_config: GenerationConfig {
                    response_modalities: vec!["TEXT".to_owned(), "IMAGE".to_owned()],
                    candidate_count: 1,
                    image_config: ImageConfig {
                        aspect_ratio: aspect_ratio.clone(),
                        image_size: spec.has_selectable_size().then(|| tier.label().to_owned()),
                    },
                },
            });
            (payload, tier.label())
        }
    };

    Ok(PreparedRequest {
        spec,
        payload,
        image_count,
        metadata: RecordMetadata {
            prompt,
            aspect_ratio,
            size_label: size_label.to_owned(),
            mode: spec.tag,
        },
    })
}

fn predict_image(image: &ReferenceImage) -> PredictImage {
    PredictImage {
        bytes_base64_encoded: image.base64_data.clone(),
        mime_type: image.mime_type.clone(),
    }
}
