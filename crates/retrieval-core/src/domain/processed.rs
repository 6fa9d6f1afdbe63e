//! Processed file records: one per successfully downloaded file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ClientId, ConfigurationId, DiscoveredFileId};

/// SHA-256 is the only supported checksum algorithm, but the field is
/// carried as a name rather than assumed so a future algorithm addition
/// doesn't require a schema migration.
pub const CHECKSUM_ALGORITHM_SHA256: &str = "SHA-256";

/// A discovered file whose content was downloaded and checksummed
///
/// Identity is `discoveredFileId`, 1:1 with [`super::discovery::DiscoveredFile`].
/// A duplicate insert attempt on the same id returns an "already exists"
/// sentinel at the store layer rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFileRecord {
    pub client_id: ClientId,
    pub configuration_id: ConfigurationId,
    pub discovered_file_id: DiscoveredFileId,
    pub downloaded_size_bytes: u64,
    pub checksum_algorithm: String,
    pub checksum_hex: String,
    pub processed_at: DateTime<Utc>,
    pub correlation_id: String,
    pub idempotency_key: String,
}

impl ProcessedFileRecord {
    #[must_use]
    pub fn new(
        client_id: ClientId,
        configuration_id: ConfigurationId,
        discovered_file_id: DiscoveredFileId,
        downloaded_size_bytes: u64,
        checksum_hex: impl Into<String>,
        processed_at: DateTime<Utc>,
        correlation_id: impl Into<String>,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            client_id,
            configuration_id,
            discovered_file_id,
            downloaded_size_bytes,
            checksum_algorithm: CHECKSUM_ALGORITHM_SHA256.to_string(),
            checksum_hex: checksum_hex.into(),
            processed_at,
            correlation_id: correlation_id.into(),
            idempotency_key: idempotency_key.into(),
        }
    }
}
