use serde::Deserialize;
use url::Url;

/// Blob store configuration for generated images
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Bucket receiving generated images
    pub bucket: String,
    /// Logical path prefix for object keys
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Cache directive stored on every object
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
    /// Storage API host override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Host used when composing public object URLs
    #[serde(default)]
    pub public_base_url: Option<Url>,
}

fn default_prefix() -> String {
    "generated".to_string()
}

fn default_cache_control() -> String {
    "public, max-age=31536000".to_string()
}
