//! Environment-variable-backed [`SecretStore`], shared with `retrieval-worker`'s
//! adapter of the same name so `trigger` resolves credentials the same way the
//! running worker would.

use async_trait::async_trait;
use retrieval_core::ports::SecretStore;

pub struct EnvSecretStore;

impl EnvSecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn env_var_name(identifier: &str) -> String {
        let normalized: String = identifier
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("RETRIEVAL_SECRET_{normalized}")
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn resolve(&self, identifier: &str) -> anyhow::Result<String> {
        let var_name = Self::env_var_name(identifier);
        std::env::var(&var_name).map_err(|_| anyhow::anyhow!("secret {identifier} not found (expected env var {var_name})"))
    }
}
