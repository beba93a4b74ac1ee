//! Entity registry for looking up repositories by entity type name
//!
//! The hosting layer dispatches requests by resource name. Each registered
//! type gets an [`EntityDescriptor`] that runs the generic repository
//! operations over JSON, so the dispatcher needs no entity-specific code.

use crate::core::entity::Entity;
use crate::core::error::{EntityError, OutpostResult};
use crate::core::repository::Repository;
use crate::storage::EntityStore;
use indexmap::IndexMap;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Type-erased repository operations for one entity type
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "agent")
    fn entity_type(&self) -> &'static str;

    /// The plural form (e.g., "agents")
    fn plural(&self) -> &'static str;

    /// All committed entities as a JSON array
    fn list_json(&self, store: &EntityStore) -> OutpostResult<Value>;

    fn get_json(&self, store: &EntityStore, id: &Uuid) -> OutpostResult<Value>;

    /// Stage an add from a JSON body, returning the entity with its identifier
    fn add_json(&self, store: &EntityStore, body: Value) -> OutpostResult<Value>;

    /// Stage a replacement; the path identifier wins over any in the body
    fn update_json(&self, store: &EntityStore, id: &Uuid, body: Value) -> OutpostResult<()>;

    fn remove(&self, store: &EntityStore, id: &Uuid) -> OutpostResult<()>;
}

/// [`EntityDescriptor`] backed by the generic repository of `T`
pub struct TypedDescriptor<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> TypedDescriptor<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    fn decode(body: Value) -> OutpostResult<T> {
        serde_json::from_value(body)
            .map_err(|e| EntityError::serialization(T::resource_name_singular(), e).into())
    }

    fn encode(entity: &T) -> OutpostResult<Value> {
        serde_json::to_value(entity)
            .map_err(|e| EntityError::serialization(T::resource_name_singular(), e).into())
    }
}

impl<T: Entity> Default for TypedDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityDescriptor for TypedDescriptor<T> {
    fn entity_type(&self) -> &'static str {
        T::resource_name_singular()
    }

    fn plural(&self) -> &'static str {
        T::resource_name()
    }

    fn list_json(&self, store: &EntityStore) -> OutpostResult<Value> {
        let entities = store
            .repository::<T>()
            .get_all()?
            .map(|entity| entity.and_then(|entity| Self::encode(&entity)))
            .collect::<OutpostResult<Vec<_>>>()?;
        Ok(Value::Array(entities))
    }

    fn get_json(&self, store: &EntityStore, id: &Uuid) -> OutpostResult<Value> {
        let entity = store.repository::<T>().get_by_id(id)?;
        Self::encode(&entity)
    }

    fn add_json(&self, store: &EntityStore, body: Value) -> OutpostResult<Value> {
        let entity = store.repository::<T>().add(Self::decode(body)?)?;
        Self::encode(&entity)
    }

    fn update_json(&self, store: &EntityStore, id: &Uuid, body: Value) -> OutpostResult<()> {
        let mut entity = Self::decode(body)?;
        entity.set_id(*id);
        store.repository::<T>().update(entity)
    }

    fn remove(&self, store: &EntityStore, id: &Uuid) -> OutpostResult<()> {
        store.repository::<T>().remove(id)
    }
}

/// Registry for all entity types exposed by the host
#[derive(Default, Clone)]
pub struct EntityRegistry {
    descriptors: IndexMap<&'static str, Arc<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: IndexMap::new(),
        }
    }

    /// Register an entity type; registering the same type again replaces it
    pub fn register<T: Entity>(&mut self) {
        self.register_descriptor(Arc::new(TypedDescriptor::<T>::new()));
    }

    pub fn register_descriptor(&mut self, descriptor: Arc<dyn EntityDescriptor>) {
        self.descriptors.insert(descriptor.entity_type(), descriptor);
    }

    /// Look up a descriptor by singular or plural name
    pub fn get(&self, name: &str) -> Option<Arc<dyn EntityDescriptor>> {
        self.descriptors
            .get(name)
            .or_else(|| {
                self.descriptors
                    .values()
                    .find(|descriptor| descriptor.plural() == name)
            })
            .cloned()
    }

    /// Registered entity types, in registration order
    pub fn entity_types(&self) -> Vec<&'static str> {
        self.descriptors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
