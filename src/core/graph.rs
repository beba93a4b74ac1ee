//! Reference-preserving serialization of entity graphs
//!
//! An [`EntityGraph`] holds one node per `(type, id)`. Inserting the same
//! entity twice keeps the first node, and relations inside node values are
//! written as `{"$ref": "<id>"}` tokens, so a graph with cycles serializes to
//! finite JSON. After reading a graph back, relations resolve against its
//! nodes, which yields the single node for each id rather than a duplicate.
//!
//! Wire format:
//!
//! ```json
//! {
//!   "$values": [
//!     { "$id": "7f0c…", "$type": "agent", "value": { "id": "7f0c…", "hostname": "ws-01" } },
//!     { "$id": "19aa…", "$type": "task",  "value": { "id": "19aa…", "agent": { "$ref": "7f0c…" } } }
//!   ]
//! }
//! ```

use crate::core::entity::Entity;
use crate::core::error::{EntityError, OutpostResult};
use crate::core::relation::{
    EntityReference, Relation, RelationSource, SourceVersion, next_source_id,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct GraphNode {
    #[serde(rename = "$id")]
    id: Uuid,
    #[serde(rename = "$type")]
    entity_type: String,
    value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphDocument {
    #[serde(rename = "$values")]
    values: Vec<GraphNode>,
}

/// A set of entities keyed by reference, serialized without duplication
#[derive(Debug)]
pub struct EntityGraph {
    source: u64,
    generation: u64,
    nodes: IndexMap<EntityReference, Value>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::with_nodes(IndexMap::new())
    }

    fn with_nodes(nodes: IndexMap<EntityReference, Value>) -> Self {
        Self {
            source: next_source_id(),
            generation: 0,
            nodes,
        }
    }

    /// Add an entity to the graph
    ///
    /// Returns `false` when a node for the same `(type, id)` already exists;
    /// the existing node is kept.
    pub fn insert<T: Entity>(&mut self, entity: &T) -> OutpostResult<bool> {
        let reference = entity
            .reference()
            .ok_or_else(|| EntityError::MissingIdentifier {
                entity_type: T::resource_name_singular().to_string(),
            })?;

        if self.nodes.contains_key(&reference) {
            return Ok(false);
        }

        let value = serde_json::to_value(entity)
            .map_err(|e| EntityError::serialization(T::resource_name_singular(), e))?;
        self.nodes.insert(reference, value);
        self.generation += 1;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, reference: &EntityReference) -> bool {
        self.nodes.contains_key(reference)
    }

    /// Get the node for `T` with the given id
    pub fn get<T: Entity>(&self, id: &Uuid) -> OutpostResult<T> {
        self.fetch(id)
    }

    /// Resolve a relation against the graph's nodes
    pub fn resolve<T: Entity>(&self, relation: &Relation<T>) -> OutpostResult<Arc<T>> {
        relation.load(self)
    }

    /// All nodes of type `T`, in insertion order
    pub fn entities<T: Entity>(&self) -> OutpostResult<Vec<T>> {
        self.nodes
            .iter()
            .filter(|(reference, _)| reference.entity_type == T::resource_name_singular())
            .map(|(_, value)| {
                T::deserialize(value)
                    .map_err(|e| EntityError::serialization(T::resource_name_singular(), e).into())
            })
            .collect()
    }

    /// Serialize the graph into its `$values` document
    pub fn to_json(&self) -> OutpostResult<Value> {
        let document = GraphDocument {
            values: self
                .nodes
                .iter()
                .map(|(reference, value)| GraphNode {
                    id: reference.id,
                    entity_type: reference.entity_type.clone(),
                    value: value.clone(),
                })
                .collect(),
        };

        serde_json::to_value(document)
            .map_err(|e| EntityError::serialization("entity_graph", e).into())
    }

    /// Read a graph from its `$values` document
    ///
    /// Duplicate `(type, id)` nodes keep the first occurrence.
    pub fn from_json(value: Value) -> OutpostResult<Self> {
        let document: GraphDocument = serde_json::from_value(value)
            .map_err(|e| EntityError::serialization("entity_graph", e))?;

        let mut nodes = IndexMap::with_capacity(document.values.len());
        for node in document.values {
            nodes
                .entry(EntityReference::new(node.id, node.entity_type))
                .or_insert(node.value);
        }

        Ok(Self::with_nodes(nodes))
    }
}

impl RelationSource for EntityGraph {
    fn fetch<T: Entity>(&self, id: &Uuid) -> OutpostResult<T> {
        let reference = EntityReference::new(*id, T::resource_name_singular());
        let value = self
            .nodes
            .get(&reference)
            .ok_or_else(|| EntityError::not_found(T::resource_name_singular(), *id))?;

        T::deserialize(value)
            .map_err(|e| EntityError::serialization(T::resource_name_singular(), e).into())
    }

    fn version(&self) -> SourceVersion {
        SourceVersion::new(self.source, self.generation)
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EntityGraph {
    fn clone(&self) -> Self {
        Self::with_nodes(self.nodes.clone())
    }
}
