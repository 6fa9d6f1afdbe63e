//! Protocol adapter port
//!
//! One implementation per supported protocol (FTP/FTPS, HTTPS, Azure
//! Blob), each stateless and pattern-matching its own
//! [`crate::domain::ProtocolSettings`] variant. Retry policy is not the
//! adapter's concern — see `retrieval-scheduler`'s File-Check Service,
//! which owns the 3-attempt exponential backoff around `list`.

use tokio_util::sync::CancellationToken;

use crate::domain::{ErrorCategory, ListedFile, ProtocolSettings};

/// An adapter-level failure, classified into one of the three categories
/// this layer is allowed to produce.
#[derive(Debug, thiserror::Error)]
#[error("{category:?}: {message}")]
pub struct AdapterError {
    pub category: ErrorCategory,
    pub message: String,
}

impl AdapterError {
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable_adapter_error()
    }
}

/// Lists and downloads files from one protocol, given its settings
#[async_trait::async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Enumerates files at `expanded_path` whose name matches
    /// `expanded_filename` (case-insensitive exact match, or glob
    /// semantics if it contains `*`) and, if `extension` is given, whose
    /// suffix equals `.{extension}`. Non-matching entries are silently
    /// dropped; the returned order is not guaranteed.
    async fn list(
        &self,
        settings: &ProtocolSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedFile>, AdapterError>;

    /// Downloads the bytes of `file_url` under the same credentials as
    /// `list`. Fails if the transfer yields zero bytes.
    async fn download(
        &self,
        settings: &ProtocolSettings,
        file_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AdapterError>;
}
