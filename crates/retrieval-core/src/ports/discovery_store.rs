//! Discovery store port
//!
//! The unique-key constraint on `(clientId, configurationId, fileUrl,
//! discoveryDate)` is the system's sole idempotency mechanism. `create`
//! returning `Ok(None)` on a duplicate is not an error path — it is the
//! expected steady-state outcome on redelivery.

use chrono::NaiveDate;

use crate::domain::{ClientId, ConfigurationId, DiscoveredFile, ExecutionId};

use super::store_error::StoreError;

#[async_trait::async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Inserts `file`. Returns the inserted record on success, or
    /// `Ok(None)` when the unique-key constraint is violated — a
    /// duplicate is silent success, never [`StoreError::Conflict`].
    async fn create(&self, file: DiscoveredFile) -> Result<Option<DiscoveredFile>, StoreError>;

    /// Explicit pre-check, for callers that want to avoid constructing a
    /// full record before knowing whether it would collide.
    async fn exists(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        file_url: &str,
        discovery_date: NaiveDate,
    ) -> Result<bool, StoreError>;

    async fn list_by_execution(
        &self,
        client_id: &ClientId,
        execution_id: &ExecutionId,
    ) -> Result<Vec<DiscoveredFile>, StoreError>;

    async fn list_by_configuration(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        limit: u32,
    ) -> Result<Vec<DiscoveredFile>, StoreError>;
}
