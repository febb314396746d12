//! Content graph nodes: identity, digests and node shapes

pub mod digest;
pub mod identity;
pub mod node;

pub use digest::{CanonicalError, ContentDigest, canonical_json};
pub use identity::{NodeId, NodeIdFactory};
pub use node::{GraphNode, NodeCreationRequest, NodeInternal};
