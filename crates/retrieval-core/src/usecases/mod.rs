//! Usecases: orchestration logic expressed purely against ports

pub mod file_check;

pub use file_check::{FileCheckOutcome, FileCheckService};
