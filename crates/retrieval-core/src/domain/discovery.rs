//! Discovered file records: the at-most-once discovery anchor

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ClientId, ConfigurationId, DiscoveredFileId, ExecutionId};

/// One `(fileUrl, discoveryDate)` observation under a configuration
///
/// Identity is `(clientId, configurationId, fileUrl, discoveryDate)` — a
/// unique-key constraint enforced by the store, not by this type. A
/// duplicate insert attempt is the idempotency mechanism itself (see
/// [`crate::ports::discovery_store::DiscoveryStore::create`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub client_id: ClientId,
    pub configuration_id: ConfigurationId,
    pub discovered_file_id: DiscoveredFileId,
    pub execution_id: ExecutionId,
    pub file_url: String,
    pub filename: String,
    pub size_bytes: u64,
    /// UTC calendar date of the *scheduled* execution instant, not the
    /// instant of discovery. A single scheduled check that straddles
    /// midnight UTC must not split across two discovery dates, or
    /// redelivery of a slow listing would defeat the uniqueness
    /// constraint this field is keyed on.
    pub discovery_date: NaiveDate,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredFile {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: ClientId,
        configuration_id: ConfigurationId,
        execution_id: ExecutionId,
        file_url: impl Into<String>,
        filename: impl Into<String>,
        size_bytes: u64,
        discovery_date: NaiveDate,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            configuration_id,
            discovered_file_id: DiscoveredFileId::new(),
            execution_id,
            file_url: file_url.into(),
            filename: filename.into(),
            size_bytes,
            discovery_date,
            discovered_at,
        }
    }
}

/// A single listed entry returned by a protocol adapter's `list` operation,
/// prior to idempotent insertion into the discovery store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedFile {
    pub file_url: String,
    pub filename: String,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_file_ids_are_unique() {
        let client_id = ClientId::new("acme").unwrap();
        let configuration_id = ConfigurationId::new();
        let execution_id = ExecutionId::new();
        let now = Utc::now();
        let date = now.date_naive();
        let a = DiscoveredFile::new(
            client_id.clone(),
            configuration_id,
            execution_id,
            "/seed-1.txt",
            "seed-1.txt",
            10,
            date,
            now,
        );
        let b = DiscoveredFile::new(
            client_id,
            configuration_id,
            execution_id,
            "/seed-1.txt",
            "seed-1.txt",
            10,
            date,
            now,
        );
        assert_ne!(a.discovered_file_id, b.discovered_file_id);
    }
}
