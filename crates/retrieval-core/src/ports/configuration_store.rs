//! Configuration store port
//!
//! Partitioned by `clientId`; every query carries it as a leading
//! parameter, and implementations must refuse cross-partition scans
//! except [`ConfigurationStore::get_all_active`], the one sanctioned
//! cross-partition read (used only by the scheduler).

use crate::domain::{ClientId, ConfigurationId, ProtocolTag, RetrievalConfiguration};

use super::store_error::StoreError;

/// Optional narrowing filters for [`ConfigurationStore::get_by_client_paginated`]
#[derive(Debug, Clone, Default)]
pub struct ConfigurationFilter {
    pub protocol: Option<ProtocolTag>,
    pub is_active: Option<bool>,
}

/// One page of a paginated configuration listing
#[derive(Debug, Clone)]
pub struct ConfigurationPage {
    pub items: Vec<RetrievalConfiguration>,
    /// Opaque; pass back verbatim to fetch the next page. `None` means
    /// this was the last page.
    pub continuation_token: Option<String>,
}

#[async_trait::async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Inserts a new configuration. Fails with [`StoreError::Conflict`]
    /// if the `(clientId, configurationId)` identity already exists.
    async fn create(&self, config: RetrievalConfiguration) -> Result<(), StoreError>;

    /// One-row read; returns `Ok(None)` on miss (never reveals whether
    /// the id exists under a different client — see client-isolation
    /// invariant).
    async fn get_by_id(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
    ) -> Result<Option<RetrievalConfiguration>, StoreError>;

    /// Paginated, ordered by `createdAt` descending. `page_size` is
    /// clamped to 100 by callers before reaching this port.
    async fn get_by_client_paginated(
        &self,
        client_id: &ClientId,
        page_size: u32,
        continuation_token: Option<String>,
        filter: ConfigurationFilter,
    ) -> Result<ConfigurationPage, StoreError>;

    /// Every active configuration across all clients. The scheduler's
    /// one sanctioned cross-partition read.
    async fn get_all_active(&self) -> Result<Vec<RetrievalConfiguration>, StoreError>;

    /// Replaces the stored record. `config.etag` must match the
    /// currently-persisted value or this fails with
    /// [`StoreError::PreconditionFailed`]; on success the stored ETag is
    /// rotated.
    async fn update(&self, config: RetrievalConfiguration) -> Result<RetrievalConfiguration, StoreError>;

    /// Sets `isActive = false` via `update`, ETag-checked identically.
    async fn soft_delete(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        etag: &crate::domain::ETag,
    ) -> Result<(), StoreError>;
}
