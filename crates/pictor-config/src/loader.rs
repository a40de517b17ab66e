use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, CredentialsConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty or a duration is malformed
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server_config()?;
        self.validate_provider_config()?;
        self.validate_credentials_config()?;
        self.validate_storage_config()?;
        Ok(())
    }

    fn validate_server_config(&self) -> anyhow::Result<()> {
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be greater than 0");
        }

        if !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }

    fn validate_provider_config(&self) -> anyhow::Result<()> {
        let provider = &self.provider;

        if provider.project.trim().is_empty() {
            anyhow::bail!("provider.project must not be empty");
        }

        if provider.location.trim().is_empty() {
            anyhow::bail!("provider.location must not be empty");
        }

        if provider.max_attempts == 0 {
            anyhow::bail!("provider.max_attempts must be at least 1");
        }

        for (field, value) in [
            ("timeout", &provider.timeout),
            ("execution_ceiling", &provider.execution_ceiling),
            ("backoff", &provider.backoff),
            ("stagger", &provider.stagger),
        ] {
            duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid provider.{field} '{value}': {e}"))?;
        }

        for (mode, model) in provider.models.iter() {
            if model.trim().is_empty() {
                anyhow::bail!("provider.models.{mode} must not be empty");
            }
        }

        Ok(())
    }

    fn validate_credentials_config(&self) -> anyhow::Result<()> {
        if let CredentialsConfig::Static { ref token } = self.credentials
            && token.expose_secret().is_empty()
        {
            anyhow::bail!("credentials.token must not be empty for static credentials");
        }

        Ok(())
    }

    fn validate_storage_config(&self) -> anyhow::Result<()> {
        if self.storage.bucket.trim().is_empty() {
            anyhow::bail!("storage.bucket must not be empty");
        }

        if self.storage.prefix.starts_with('/') || self.storage.prefix.ends_with('/') {
            anyhow::bail!("storage.prefix must not start or end with '/'");
        }

        Ok(())
    }
}
