//! Environment-variable-backed [`SecretStore`]
//!
//! Configurations carry opaque secret identifiers (`password_secret_id`
//! etc.); this adapter resolves one to the value of an environment
//! variable named `RETRIEVAL_SECRET_{identifier, uppercased, non-alnum
//! replaced with '_'}`. A vault-backed adapter implementing the same
//! trait is a drop-in swap — nothing upstream of `SecretStore::resolve`
//! knows which one is in use.

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
