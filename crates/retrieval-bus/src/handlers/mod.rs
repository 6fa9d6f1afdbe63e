//! The five message handlers: thin wrappers over the store/usecase ports
//! that validate, delegate, and publish an outcome event

pub mod create_configuration;
pub mod delete_configuration;
pub mod execute_file_check;
pub mod process_discovered_file;
pub mod update_configuration;
