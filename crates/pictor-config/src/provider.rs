use serde::Deserialize;
use url::Url;

/// Upstream image provider (Vertex AI) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Cloud project that owns the model quota
    pub project: String,
    /// Region of the model endpoints ("global" selects the non-regional host)
    #[serde(default = "default_location")]
    pub location: String,
    /// Base URL override, up to and including the API version segment
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Timeout for a single upstream call
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Hard ceiling for serving one request end to end
    #[serde(default = "default_execution_ceiling")]
    pub execution_ceiling: String,
    /// Attempts per call, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay unit before a retry, multiplied by the failed attempt number
    #[serde(default = "default_backoff")]
    pub backoff: String,
    /// Delay unit between fan-out calls, multiplied by the slot index
    #[serde(default = "default_stagger")]
    pub stagger: String,
    /// Per-mode model identifier overrides
    #[serde(default)]
    pub models: ModelOverrides,
}

/// Model identifier overrides keyed by mode tag
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModelOverrides {
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub fast: Option<String>,
    #[serde(default)]
    pub ultra: Option<String>,
    #[serde(default)]
    pub multimodal_v1: Option<String>,
    #[serde(default)]
    pub multimodal_v2: Option<String>,
    #[serde(default)]
    pub upscale: Option<String>,
}

impl ModelOverrides {
    /// Look up the override for a canonical mode tag
    pub fn get(&self, mode: &str) -> Option<&str> {
        let model = match mode {
            "standard" => &self.standard,
            "fast" => &self.fast,
            "ultra" => &self.ultra,
            "multimodal-v1" => &self.multimodal_v1,
            "multimodal-v2" => &self.multimodal_v2,
            "upscale" => &self.upscale,
            _ => return None,
        };
        model.as_deref()
    }

    /// Iterate over the overrides that are set
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("standard", &self.standard),
            ("fast", &self.fast),
            ("ultra", &self.ultra),
            ("multimodal-v1", &self.multimodal_v1),
            ("multimodal-v2", &self.multimodal_v2),
            ("upscale", &self.upscale),
        ]
        .into_iter()
        .filter_map(|(mode, model)| model.as_deref().map(|m| (mode, m)))
    }
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_timeout() -> String {
    "120s".to_string()
}

fn default_execution_ceiling() -> String {
    "300s".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> String {
    "2s".to_string()
}

fn default_stagger() -> String {
    "800ms".to_string()
}
