//! Database connection pool management
//!
//! WAL journal mode for concurrent reads, schema migration on first
//! connection, and an in-memory mode for tests, with a single combined
//! migration file since this schema has no prior versions to carry
//! forward.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::StoreSetupError;

pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Connects to a file-backed database, creating parent directories
    /// and the file itself if needed, then runs migrations.
    pub async fn new(db_path: &Path) -> Result<Self, StoreSetupError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreSetupError::ConnectionFailed(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreSetupError::ConnectionFailed(format!(
                    "failed to connect to database at {}: {e}",
                    db_path.display()
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "database pool initialized");
        Ok(Self { pool })
    }

    /// Single-connection, in-memory pool for tests — a second connection
    /// would see an empty database, since SQLite's `:memory:` databases
    /// are per-connection.
    pub async fn in_memory() -> Result<Self, StoreSetupError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreSetupError::ConnectionFailed(format!("in-memory database: {e}")))?;

        Self::run_migrations(&pool).await?;
        tracing::debug!("in-memory database pool initialized");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreSetupError> {
        let migration_sql = include_str!("migrations/20260115_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| StoreSetupError::MigrationFailed(e.to_string()))?;
        tracing::debug!("store migrations complete");
        Ok(())
    }
}
