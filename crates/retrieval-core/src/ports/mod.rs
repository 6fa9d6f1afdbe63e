//! Driven ports: interfaces the domain calls outward through
//!
//! Construction-time domain errors are closed `thiserror` enums, while
//! every port method here returns `anyhow::Result` (or the narrower
//! [`store_error::StoreError`] for the four store ports) because callers
//! need an opaque, contextualized error, not a variant to match on.

pub mod clock;
pub mod configuration_store;
pub mod discovery_store;
pub mod execution_store;
pub mod processed_store;
pub mod protocol_adapter;
pub mod publisher;
pub mod secret_store;
pub mod store_error;

pub use clock::{Clock, SystemClock};
pub use configuration_store::{ConfigurationFilter, ConfigurationPage, ConfigurationStore};
pub use discovery_store::DiscoveryStore;
pub use execution_store::{ExecutionPage, ExecutionStore};
pub use processed_store::ProcessedFileStore;
pub use protocol_adapter::{AdapterError, ProtocolAdapter};
pub use publisher::Publisher;
pub use secret_store::SecretStore;
pub use store_error::StoreError;
