//! Domain model, driven ports, and pure usecases for the scheduled
//! file-discovery service.
//!
//! This crate has no I/O of its own: every external effect (persistence,
//! protocol access, message publishing, the system clock) is expressed
//! as a trait in [`ports`], so [`usecases`] are testable against
//! in-memory fakes and reused unchanged by whichever concrete adapters
//! a deployment wires in (see `retrieval-protocols`, `retrieval-store`,
//! `retrieval-bus`).

pub mod domain;
pub mod ports;
pub mod usecases;
