//! Reduce per-slot provider results to decoded images or one failure

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

use crate::protocol::ProviderResult;

/// Decoded image paired with the text its slot returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub auxiliary_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// No images, but at least one slot explained why
    #[error("generation refused: {reason}")]
    Refused { reason: String },
    /// No images and no explanation
    #[error("no images produced")]
    NoImages {
        /// Some slot failed on a deadline
        timed_out: bool,
    },
}

/// Collect every image across `results` in slot order
///
/// A slot with text and no image, or an explicit refusal, records its text
/// as the refusal reason; the last one seen wins. Partial success is not an
/// error.
pub fn reconcile(results: Vec<ProviderResult>) -> Result<Vec<ReconciledImage>, ReconcileError> {
    let mut images = Vec::new();
    let mut refusal_reason = None;
    let mut timed_out = false;

    for (slot, result) in results.into_iter().enumerate() {
        match result {
            ProviderResult::Success {
                images: payloads,
                auxiliary_text,
            } => {
                if payloads.is_empty() {
                    if auxiliary_text.is_some() {
                        refusal_reason = auxiliary_text;
                    }
                    continue;
                }

                for payload in payloads {
                    match STANDARD.decode(payload.data.trim()) {
                        Ok(bytes) => images.push(ReconciledImage {
                            bytes,
                            mime_type: payload.mime_type,
                            auxiliary_text: auxiliary_text.clone(),
                        }),
                        Err(e) => tracing::warn!(slot, error = %e, "dropping undecodable image"),
                    }
                }
            }
            ProviderResult::Failure {
                message,
                is_refusal: true,
                ..
            } => refusal_reason = Some(message),
            ProviderResult::Failure {
                timed_out: slot_timed_out,
                ..
            } => timed_out |= slot_timed_out,
        }
    }

    if !images.is_empty() {
        return Ok(images);
    }

    match refusal_reason {
        Some(reason) => Err(ReconcileError::Refused { reason }),
        None => Err(ReconcileError::NoImages { timed_out }),
    }
}
