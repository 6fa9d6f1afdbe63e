//! Processed-record store port

use crate::domain::{ClientId, ConfigurationId, DiscoveredFileId, ExecutionId, ProcessedFileRecord};

use super::store_error::StoreError;

#[async_trait::async_trait]
pub trait ProcessedFileStore: Send + Sync {
    /// Inserts `record`, keyed on `discoveredFileId`. Returns `Ok(None)`
    /// when a record for that id already exists — the handler skips
    /// event re-emission on this outcome rather than treating it as an
    /// error.
    async fn create(
        &self,
        record: ProcessedFileRecord,
    ) -> Result<Option<ProcessedFileRecord>, StoreError>;

    async fn list_by_configuration(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        limit: u32,
        filename_filter: Option<&str>,
        execution_id: Option<&ExecutionId>,
    ) -> Result<Vec<ProcessedFileRecord>, StoreError>;

    async fn get_by_discovered_file_id(
        &self,
        client_id: &ClientId,
        discovered_file_id: &DiscoveredFileId,
    ) -> Result<Option<ProcessedFileRecord>, StoreError>;
}
