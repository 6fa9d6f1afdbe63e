//! Execution store port

use chrono::{DateTime, Utc};

use crate::domain::{ClientId, ConfigurationId, Execution, ExecutionId};

use super::store_error::StoreError;

/// One page of a paginated execution listing
#[derive(Debug, Clone)]
pub struct ExecutionPage {
    pub items: Vec<Execution>,
    pub continuation_token: Option<String>,
}

#[async_trait::async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create(&self, execution: Execution) -> Result<(), StoreError>;

    /// `execution.etag` must match the persisted value; terminal
    /// executions are otherwise immutable except for `retryCount`.
    async fn update(&self, execution: Execution) -> Result<Execution, StoreError>;

    async fn get_by_id(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        execution_id: &ExecutionId,
    ) -> Result<Option<Execution>, StoreError>;

    async fn list_for_range(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Execution>, StoreError>;

    async fn list_paginated(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        page_size: u32,
        continuation_token: Option<String>,
    ) -> Result<ExecutionPage, StoreError>;
}
