//! Result of one fetch: raw records grouped by entity type

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::entity::EntityType;
use crate::error::QueryError;

/// Raw records fetched in one pass, keyed by entity type
///
/// Order within a type is the order the API returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    records: BTreeMap<EntityType, Vec<Value>>,
}

impl SourceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from the `data` object of the source query
    ///
    /// Every known collection must be present as an array.
    pub fn from_query_data(mut data: Map<String, Value>) -> Result<Self, QueryError> {
        let mut batch = Self::new();

        for entity_type in EntityType::ALL {
            match data.remove(entity_type.collection()) {
                Some(Value::Array(records)) => batch.extend(entity_type, records),
                _ => {
                    return Err(QueryError::MissingCollection(
                        entity_type.collection().to_string(),
                    ));
                }
            }
        }

        Ok(batch)
    }

    pub fn extend(&mut self, entity_type: EntityType, records: impl IntoIterator<Item = Value>) {
        self.records.entry(entity_type).or_default().extend(records);
    }

    /// Builder-style variant of [`SourceBatch::extend`]
    pub fn with(mut self, entity_type: EntityType, records: impl IntoIterator<Item = Value>) -> Self {
        self.extend(entity_type, records);
        self
    }

    pub fn records(&self, entity_type: EntityType) -> &[Value] {
        self.records
            .get(&entity_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate entity types in processing order with their records
    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &[Value])> {
        self.records.iter().map(|(t, r)| (*t, r.as_slice()))
    }

    /// Total number of records across all types
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_query_data() {
        let data = json!({
            "posts": [{ "id": 1 }, { "id": 2 }],
            "authors": [{ "id": "a" }]
        });
        let Value::Object(map) = data else { unreachable!() };

        let batch = SourceBatch::from_query_data(map).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.records(EntityType::Post).len(), 2);
        assert_eq!(batch.records(EntityType::Author)[0], json!({ "id": "a" }));
    }

    #[test]
    fn test_from_query_data_missing_collection() {
        let data = json!({ "posts": [] });
        let Value::Object(map) = data else { unreachable!() };

        let err = SourceBatch::from_query_data(map).unwrap_err();
        assert!(matches!(err, QueryError::MissingCollection(name) if name == "authors"));
    }

    #[test]
    fn test_from_query_data_null_collection() {
        let data = json!({ "posts": null, "authors": [] });
        let Value::Object(map) = data else { unreachable!() };

        assert!(SourceBatch::from_query_data(map).is_err());
    }

    #[test]
    fn test_iter_follows_entity_order() {
        let batch = SourceBatch::new()
            .with(EntityType::Author, vec![json!({ "id": 1 })])
            .with(EntityType::Post, vec![json!({ "id": 1 })]);

        let order: Vec<EntityType> = batch.iter().map(|(t, _)| t).collect();
        assert_eq!(order, vec![EntityType::Post, EntityType::Author]);
    }
}
