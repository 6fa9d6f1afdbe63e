//! The in-process message bus adapter, handler retry/dead-letter policy,
//! and the five message handlers (Create/Update/Delete/ExecuteFileCheck/
//! ProcessDiscoveredFile)
//!
//! Handlers are thin: validate, delegate to a usecase or store, publish an
//! outcome event. Grounded on `lnxdrive-ipc/src/service.rs`'s
//! method-per-operation async dispatch style, though the transport itself
//! is plain `tokio::sync` channels rather than D-Bus — this service has no
//! desktop session to speak over.

pub mod bus;
pub mod handlers;
pub mod retry;

pub use bus::{BusReceivers, InProcessBus};
pub use retry::RetryPolicy;

pub use handlers::create_configuration::CreateConfigurationHandler;
pub use handlers::delete_configuration::DeleteConfigurationHandler;
pub use handlers::execute_file_check::ExecuteFileCheckHandler;
pub use handlers::process_discovered_file::ProcessDiscoveredFileHandler;
pub use handlers::update_configuration::UpdateConfigurationHandler;
