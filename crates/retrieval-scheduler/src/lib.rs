//! The scheduler loop, dispatch tracking, and File-Check Service wiring
//!
//! `scheduler` decides what is due and emits `ExecuteFileCheck` commands;
//! `tracker` is the in-flight set + concurrency semaphore shared between
//! dispatch and completion; `executor` is what a bus handler calls when
//! that command is received, wiring a resolved adapter into
//! `retrieval_core::usecases::FileCheckService`.

pub mod config;
pub mod executor;
pub mod registry;
pub mod scheduler;
pub mod tracker;

pub use config::{SchedulerConfig, SchedulerConfigError};
pub use executor::FileCheckExecutor;
pub use registry::AdapterRegistry;
pub use scheduler::Scheduler;
pub use tracker::DispatchTracker;
