//! SQLite-backed persistence for the retrieval service
//!
//! One `Sqlite*Store` per port defined in `retrieval_core::ports`, all
//! sharing a single [`pool::DatabasePool`] and partitioned by `client_id`.

pub mod configuration_store;
pub mod discovery_store;
pub mod errors;
pub mod execution_store;
pub mod pool;
pub mod processed_store;

pub use configuration_store::SqliteConfigurationStore;
pub use discovery_store::SqliteDiscoveryStore;
pub use errors::StoreSetupError;
pub use execution_store::SqliteExecutionStore;
pub use pool::DatabasePool;
pub use processed_store::SqliteProcessedFileStore;
