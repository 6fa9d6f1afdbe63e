//! Shared store-layer error type
//!
//! All four store ports return this on their fallible, non-"maybe"
//! operations; plain I/O failures (connection lost, serialization fault)
//! are wrapped in [`StoreError::Unavailable`] via `anyhow`'s context chain.

use thiserror::Error;

/// Outcomes a store operation can report, beyond the ordinary
/// `anyhow::Result` wrapping used at the adapter boundary elsewhere
#[derive(Debug, Error)]
pub enum StoreError {
    /// `create` was called for an identity that already exists
    #[error("record already exists")]
    Conflict,

    /// `update`/`softDelete` carried an ETag that no longer matches
    #[error("etag mismatch")]
    PreconditionFailed,

    /// The store is unreachable or returned an unexpected fault
    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}
