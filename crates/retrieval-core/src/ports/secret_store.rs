//! Secret store port
//!
//! Configurations store opaque identifiers, never secret values.
//! Resolution happens inside an adapter call; the resolved value lives
//! only on the call stack and is never logged or persisted.

/// Resolves an opaque secret identifier to its value
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn resolve(&self, identifier: &str) -> anyhow::Result<String>;
}
