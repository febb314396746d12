//! Synchronizer - maps raw records to node creation requests

use log::{debug, error};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::RecordError;
use crate::nodes::{
    ContentDigest, GraphNode, NodeCreationRequest, NodeIdFactory, NodeInternal, canonical_json,
};
use crate::records::{EntityType, SourceBatch, SourceRecord};

/// Result of mapping one batch
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// One request per record that mapped cleanly, in batch order
    pub requests: Vec<NodeCreationRequest>,
    /// Records that were skipped, with why
    pub failures: Vec<RecordError>,
}

impl SyncOutcome {
    pub fn requests_of(&self, entity_type: EntityType) -> impl Iterator<Item = &NodeCreationRequest> {
        self.requests
            .iter()
            .filter(move |r| r.entity_type == entity_type)
    }

    /// Number of input records this outcome accounts for
    pub fn total(&self) -> usize {
        self.requests.len() + self.failures.len()
    }
}

/// Pure mapping from fetched records to node creation requests
///
/// Holds no store handle: callers register the returned requests themselves.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    ids: NodeIdFactory,
    owner: String,
}

impl Synchronizer {
    /// Create a synchronizer whose node ids live in `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        let owner = namespace.into();
        Self {
            ids: NodeIdFactory::new(&owner),
            owner,
        }
    }

    pub fn ids(&self) -> &NodeIdFactory {
        &self.ids
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Map every record in the batch
    ///
    /// A record that fails is logged and recorded in `failures`; the rest of the
    /// batch is still mapped.
    pub fn synchronize(&self, batch: &SourceBatch) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        for (entity_type, records) in batch.iter() {
            for (index, raw) in records.iter().enumerate() {
                match self.synchronize_record(entity_type, index, raw) {
                    Ok(request) => outcome.requests.push(request),
                    Err(e) => {
                        error!("Skipping record: {}", e);
                        outcome.failures.push(e);
                    }
                }
            }
        }

        debug!(
            "Mapped {} of {} records ({} skipped)",
            outcome.requests.len(),
            outcome.total(),
            outcome.failures.len()
        );

        outcome
    }

    /// Map a single raw record
    pub fn synchronize_record(
        &self,
        entity_type: EntityType,
        index: usize,
        raw: &Value,
    ) -> Result<NodeCreationRequest, RecordError> {
        let serialization = |message: String| RecordError::Serialization {
            entity_type,
            index,
            message,
        };

        let record = SourceRecord::decode(entity_type, raw).map_err(|e| serialization(e.to_string()))?;

        let remote_id = record
            .remote_id()
            .cloned()
            .ok_or(RecordError::Identity { entity_type, index })?;

        // Decoding only validates; the node keeps the record exactly as sent
        let fields = raw
            .as_object()
            .cloned()
            .ok_or_else(|| serialization("expected an object".to_string()))?;
        let content =
            canonical_json(&Value::Object(fields.clone())).map_err(|e| serialization(e.to_string()))?;

        let node = GraphNode {
            id: self.ids.node_id(entity_type.type_name(), &remote_id.key()),
            parent: None,
            children: Vec::new(),
            fields,
            links: BTreeMap::new(),
            internal: NodeInternal {
                type_name: entity_type.type_name().to_string(),
                content_digest: ContentDigest::of_bytes(content.as_bytes()),
                content,
                owner: self.owner.clone(),
            },
        };

        Ok(NodeCreationRequest {
            node,
            entity_type,
            remote_id,
            index,
        })
    }
}
