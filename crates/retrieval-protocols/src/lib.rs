//! Protocol adapters and the Schedule Evaluator
//!
//! Each adapter implements `retrieval_core::ports::ProtocolAdapter` for one
//! `ProtocolSettings` variant. `schedule` and `matching` are shared helpers
//! used by all three.

pub mod azure_blob;
pub mod ftp;
pub mod http;
pub mod matching;
pub mod schedule;

pub use azure_blob::AzureBlobAdapter;
pub use ftp::FtpAdapter;
pub use http::HttpsAdapter;
