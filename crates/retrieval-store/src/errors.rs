//! Pool setup and row-mapping error types

use thiserror::Error;

/// Failures opening or migrating the backing database — distinct from
/// [`retrieval_core::ports::StoreError`], which covers per-operation
/// outcomes once the pool is up.
#[derive(Debug, Error)]
pub enum StoreSetupError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

/// Maps a `sqlx::Error` to the port-level [`retrieval_core::ports::StoreError`].
///
/// Unique-constraint violations are the caller's responsibility to
/// interpret (a duplicate configuration is a real conflict; a duplicate
/// discovered file is silent success) — this only handles the generic
/// "store is unavailable" case.
pub fn map_sqlx_error(err: sqlx::Error) -> retrieval_core::ports::StoreError {
    retrieval_core::ports::StoreError::Unavailable(anyhow::Error::new(err))
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|de| de.is_unique_violation())
        .unwrap_or(false)
}
