use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Source of the short-lived bearer token used for provider and storage calls
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum CredentialsConfig {
    /// Fixed token supplied through configuration (typically via `{{ env.VAR }}`)
    Static {
        /// Bearer token
        token: SecretString,
    },
    /// Token fetched from the compute metadata server on every request
    MetadataServer {
        /// Token endpoint override
        #[serde(default)]
        url: Option<Url>,
    },
}
