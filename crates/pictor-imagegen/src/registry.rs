//! Mode registry
//!
//! Maps a client-facing mode tag to the concrete model, the API family that
//! shapes its payloads and responses, and the concurrency policy used to
//! dispatch it. Adding a model is a new row here, not a new code path.

use std::fmt;

use pictor_config::ModelOverrides;

/// Provider API family sharing one request/response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Single-shot `:predict` text-to-image; returns up to `sampleCount` images
    Predict,
    /// Single-shot `:predict` upscale of one reference image
    Upscale,
    /// Multi-turn `:generateContent`; one image per call
    Generate,
}

impl Family {
    /// RPC method appended to the model resource path
    pub const fn method(self) -> &'static str {
        match self {
            Self::Predict | Self::Upscale => "predict",
            Self::Generate => "generateContent",
        }
    }
}

/// How many upstream calls a request turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// One call; the provider returns every image in one response
    Single,
    /// One staggered call per requested image
    FanOut,
}

/// Discrete resolution class supported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeTier {
    OneK,
    TwoK,
    FourK,
}

impl SizeTier {
    /// Snap an arbitrary pixel hint down to a tier
    pub const fn from_hint(hint: u32) -> Self {
        match hint {
            4096.. => Self::FourK,
            2048.. => Self::TwoK,
            _ => Self::OneK,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upscale factor tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleFactor {
    X2,
    X4,
}

impl UpscaleFactor {
    /// Targets above this edge length need the larger factor
    pub const X4_THRESHOLD: u32 = 2048;

    pub const fn from_level(level: Option<u32>) -> Self {
        match level {
            Some(level) if level > Self::X4_THRESHOLD => Self::X4,
            _ => Self::X2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::X2 => "x2",
            Self::X4 => "x4",
        }
    }
}

/// Everything the pipeline needs to know about one mode
#[derive(Debug, Clone)]
pub struct ModeSpec {
    /// Canonical tag reported on outbound records
    pub tag: &'static str,
    /// Additional tags that resolve to this mode
    pub aliases: &'static [&'static str],
    /// Concrete provider model identifier
    pub model: String,
    pub family: Family,
    pub concurrency: Concurrency,
    /// Upper bound for `imageCount`
    pub max_images: u32,
    /// Reference images forwarded; extras are dropped silently
    pub max_reference_images: usize,
    /// Supported tiers in ascending order
    pub size_tiers: &'static [SizeTier],
    /// Location override for models only served from one region
    pub location: Option<&'static str>,
    /// Long-running mode whose timeouts get actionable guidance
    pub slow: bool,
}

impl ModeSpec {
    /// Whether the client must supply a prompt
    pub const fn requires_prompt(&self) -> bool {
        !matches!(self.family, Family::Upscale)
    }

    /// Clamp a requested image count into `1..=max_images`
    pub fn clamp_image_count(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(1).clamp(1, self.max_images.max(1))
    }

    /// Largest supported tier not above the hint
    pub fn serve_tier(&self, hint: Option<u32>) -> SizeTier {
        let requested = hint.map_or(SizeTier::OneK, SizeTier::from_hint);
        self.size_tiers
            .iter()
            .copied()
            .filter(|tier| *tier <= requested)
            .max()
            .or_else(|| self.size_tiers.first().copied())
            .unwrap_or(SizeTier::OneK)
    }

    /// Whether the payload should name a size tier explicitly
    pub fn has_selectable_size(&self) -> bool {
        self.size_tiers.len() > 1
    }
}

/// Lookup table from mode tag to [`ModeSpec`]
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    modes: Vec<ModeSpec>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModeRegistry {
    /// Registry with the default model for every mode
    pub fn builtin() -> Self {
        const PREDICT_TIERS: &[SizeTier] = &[SizeTier::OneK, SizeTier::TwoK];
        const ONE_K: &[SizeTier] = &[SizeTier::OneK];
        const ALL_TIERS: &[SizeTier] = &[SizeTier::OneK, SizeTier::TwoK, SizeTier::FourK];

        let predict = |tag: &'static str, model: &str, size_tiers: &'static [SizeTier]| ModeSpec {
            tag,
            aliases: &[],
            model: model.to_owned(),
            family: Family::Predict,
            concurrency: Concurrency::Single,
            max_images: 4,
            max_reference_images: 1,
            size_tiers,
            location: None,
            slow: false,
        };

        Self {
            modes: vec![
                predict("standard", "imagen-4.0-generate-001", PREDICT_TIERS),
                predict("fast", "imagen-4.0-fast-generate-001", ONE_K),
                predict("ultra", "imagen-4.0-ultra-generate-001", PREDICT_TIERS),
                ModeSpec {
                    tag: "multimodal-v1",
                    aliases: &[],
                    model: "gemini-2.5-flash-image".to_owned(),
                    family: Family::Generate,
                    concurrency: Concurrency::FanOut,
                    max_images: 4,
                    max_reference_images: 3,
                    size_tiers: ONE_K,
                    location: None,
                    slow: false,
                },
                ModeSpec {
                    tag: "multimodal-v2",
                    aliases: &["multimodal"],
                    model: "gemini-3-pro-image-preview".to_owned(),
                    family: Family::Generate,
                    concurrency: Concurrency::FanOut,
                    max_images: 4,
                    max_reference_images: 14,
                    size_tiers: ALL_TIERS,
                    location: Some("global"),
                    slow: false,
                },
                ModeSpec {
                    tag: "upscale",
                    aliases: &[],
                    model: "imagen-4.0-upscale-preview".to_owned(),
                    family: Family::Upscale,
                    concurrency: Concurrency::Single,
                    max_images: 1,
                    max_reference_images: 1,
                    size_tiers: ONE_K,
                    location: None,
                    slow: true,
                },
            ],
        }
    }

    /// Builtin registry with configured model identifiers applied
    pub fn with_overrides(overrides: &ModelOverrides) -> Self {
        let mut registry = Self::builtin();
        for spec in &mut registry.modes {
            if let Some(model) = overrides.get(spec.tag) {
                tracing::debug!(mode = spec.tag, model, "overriding mode model");
                model.clone_into(&mut spec.model);
            }
        }
        registry
    }

    /// Resolve a client-supplied tag (canonical or alias, case-insensitive)
    pub fn resolve(&self, tag: &str) -> Option<&ModeSpec> {
        let tag = tag.trim();
        self.modes.iter().find(|spec| {
            spec.tag.eq_ignore_ascii_case(tag) || spec.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(tag))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModeSpec> {
        self.modes.iter()
    }
}
