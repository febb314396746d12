//! Remote records as served by the content API

pub mod batch;
pub mod entity;
pub mod source;

pub use batch::SourceBatch;
pub use entity::{EntityType, RemoteId};
pub use source::{AuthorRecord, AuthorRef, PostRecord, SourceRecord};
