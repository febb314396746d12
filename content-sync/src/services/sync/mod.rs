//! Record synchronization
//!
//! `engine` holds the pure record-to-node mapping; `pass` drives a full pass
//! against a content source and a node registry.

pub mod engine;
pub mod pass;

pub use engine::{SyncOutcome, Synchronizer};
pub use pass::{PassPlan, PassReport, SyncPass};
